//! Per-hardfork gas parameters.

use elc_primitives::Hardfork;

/// The dynamic-cost constants of the gas schedule.
///
/// Base (static) opcode costs are the interpreter's concern and arrive at the handlers as the
/// already-charged `base_gas`; this table only holds the constants the dynamic computations
/// need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasSchedule {
    /// Linear coefficient of the memory expansion cost.
    pub memory: u64,
    /// Divisor of the quadratic term of the memory expansion cost.
    pub quad_coeff_div: u64,
    /// Fee per word copied by the *COPY opcodes.
    pub copy_word: u64,
    /// Fee per word hashed by SHA3 and the CREATE2 init-code hash.
    pub sha3_word: u64,
    /// Fee per LOG topic.
    pub log_topic: u64,
    /// Fee per LOG data byte.
    pub log_data: u64,
    /// First touch of an account within a transaction (EIP-2929).
    pub cold_account_access: u64,
    /// First touch of a storage slot within a transaction (EIP-2929).
    pub cold_sload: u64,
    /// Any subsequent touch of a warmed account or slot (EIP-2929).
    pub warm_storage_read: u64,
    /// Gas added to the callee budget of a value-bearing CALL, not charged to the caller.
    pub call_stipend: u64,
    /// Surcharge for transferring value with CALL and friends.
    pub call_value_transfer: u64,
    /// Surcharge for calling an account that has to be created.
    pub call_new_account: u64,
    /// SSTORE of a non-zero value into a zero slot.
    pub sstore_set: u64,
    /// Any other SSTORE.
    pub sstore_reset: u64,
    /// SLOAD cost used by the net-metering schedules for no-op and dirty writes.
    pub net_sstore_noop: u64,
    /// The EIP-2200 sentry: SSTORE traps when the frame has no more than this much gas left.
    pub sstore_sentry: u64,
}

/// Which SSTORE metering schedule is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SstoreMetering {
    /// The pre-Constantinople set/reset schedule. Also applies to Petersburg, which removed
    /// EIP-1283 again.
    Legacy,
    /// EIP-1283 net gas metering, active at Constantinople exactly.
    Eip1283,
    /// EIP-2200 net gas metering with the 2300 gas sentry, Istanbul and later.
    Eip2200,
}

/// A hardfork together with its gas schedule.
#[derive(Debug, Clone, Copy)]
pub struct Spec {
    fork: Hardfork,
    schedule: GasSchedule,
}

impl Spec {
    /// Builds the spec for the given hardfork.
    pub fn new(fork: Hardfork) -> Self {
        let net_sstore_noop = if fork >= Hardfork::Istanbul {
            // repriced by EIP-1884 along with SLOAD
            800
        } else {
            200
        };
        let schedule = GasSchedule {
            memory: 3,
            quad_coeff_div: 512,
            copy_word: 3,
            sha3_word: 6,
            log_topic: 375,
            log_data: 8,
            cold_account_access: 2600,
            cold_sload: 2100,
            warm_storage_read: 100,
            call_stipend: 2300,
            call_value_transfer: 9000,
            call_new_account: 25000,
            sstore_set: 20000,
            sstore_reset: 5000,
            net_sstore_noop,
            sstore_sentry: 2300,
        };
        Self { fork, schedule }
    }

    /// The hardfork this spec was built for.
    pub fn fork(&self) -> Hardfork {
        self.fork
    }

    /// The dynamic-cost constants.
    pub fn schedule(&self) -> &GasSchedule {
        &self.schedule
    }

    /// Whether EIP-2929 cold/warm access pricing applies.
    pub fn has_access_lists(&self) -> bool {
        self.fork.is_berlin_active()
    }

    /// Whether the EIP-150 63/64 call forwarding rule applies.
    pub fn has_tangerine_call_rules(&self) -> bool {
        self.fork.is_tangerine_active()
    }

    /// Whether the EIP-161 empty-account rules apply to the new-account surcharge.
    pub fn has_empty_account_semantics(&self) -> bool {
        self.fork >= Hardfork::SpuriousDragon
    }

    /// The SSTORE metering schedule of this fork.
    pub fn sstore_metering(&self) -> SstoreMetering {
        if self.fork == Hardfork::Constantinople {
            SstoreMetering::Eip1283
        } else if self.fork >= Hardfork::Istanbul {
            SstoreMetering::Eip2200
        } else {
            // includes Petersburg, which removed EIP-1283 again
            SstoreMetering::Legacy
        }
    }
}
