//! Rewards accumulator engine
//!
//! Proportional reward distribution over deposited receipt tokens with O(1)
//! work per call, independent of the number of depositors. A scaled
//! accumulator `acc_per_share` grows by `amount * ACC_SCALE / total_deposits`
//! on every distribution; each depositor keeps the accumulator value it last
//! settled at (`acc_checkpoint`) and its share since then is
//! `balance * (acc_per_share - acc_checkpoint) / ACC_SCALE`.
//!
//! Only the accumulator delta is ever multiplied by a balance. Between two
//! settlements of one depositor its balance is at most `total_deposits`, so the
//! product is bounded by lifetime reward in times `ACC_SCALE` and fits u128
//! however large `acc_per_share` has grown.
//!
//! Two buffers defer distribution:
//! - `pending_rewards`: revenue received while nothing is deposited, plus the
//!   truncation dust of previous distributions
//! - `pending_penalties`: instant-exit penalties, flushed once they reach
//!   `min_penalty_flush` or the epoch boundary passes, whichever comes first
//!
//! Mutators project the global settlement first, validate, then commit, so an
//! `Err` return leaves the engine unchanged.

use bytemuck::{Pod, Zeroable};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::wide::U128;

// ============================================================================
// Constants
// ============================================================================

#[cfg(kani)]
pub const MAX_DEPOSITORS: usize = 4;

#[cfg(all(feature = "test", not(kani)))]
pub const MAX_DEPOSITORS: usize = 64;

#[cfg(all(not(kani), not(feature = "test")))]
pub const MAX_DEPOSITORS: usize = 1024;

pub const BITMAP_WORDS: usize = (MAX_DEPOSITORS + 63) / 64;

/// Fixed-point scale of `acc_per_share`
pub const ACC_SCALE: u128 = 1_000_000_000_000_000_000;

// ============================================================================
// Core Data Structures
// ============================================================================

/// Whether `claim` is blocked while the claimant has queued ledger exits.
#[repr(u64)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
pub enum ClaimGate {
    Open = 0,
    ExitQueueEmpty = 1,
}

impl ClaimGate {
    #[inline]
    pub fn allows(self, exit_queue_len: usize) -> bool {
        match self {
            ClaimGate::Open => true,
            ClaimGate::ExitQueueEmpty => exit_queue_len == 0,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct Depositor {
    pub owner: [u8; 32],

    /// Receipt tokens deposited
    pub balance: u64,

    /// Settled, not yet claimed reward
    pub unclaimed: u64,

    /// `acc_per_share` as of the last settlement
    pub acc_checkpoint: U128,
}

/// Construction-time parameters. Immutable after init.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct RewardsParams {
    /// Seconds after which buffered penalties are force-flushed
    pub epoch_duration: u64,

    /// Smallest first deposit into an empty pool
    pub min_initial_deposit: u64,

    /// Buffered penalty total that triggers a flush before the epoch ends
    pub min_penalty_flush: u64,

    /// `ClaimGate` discriminant
    pub claim_gate: u64,
}

impl RewardsParams {
    /// Unknown discriminants fail closed.
    pub fn claim_gate(&self) -> ClaimGate {
        ClaimGate::from_u64(self.claim_gate).unwrap_or(ClaimGate::ExitQueueEmpty)
    }
}

/// Rewards engine state - fixed depositor table with bitmap
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct RewardsEngine {
    pub params: RewardsParams,

    /// Cumulative reward per deposited unit, scaled by ACC_SCALE. Never decreases.
    pub acc_per_share: U128,

    pub pending_rewards: u64,

    pub pending_penalties: u64,

    /// Sum of depositor balances
    pub total_deposits: u64,

    /// Start of the current epoch (unix seconds)
    pub epoch_clock: i64,

    /// Number of epoch boundaries crossed
    pub epoch: u64,

    /// Lifetime rewards and penalties received
    pub total_reward_in: u64,

    /// Lifetime rewards paid out
    pub total_claimed: u64,

    pub num_depositors: u64,

    pub used: [u64; BITMAP_WORDS],

    pub depositors: [Depositor; MAX_DEPOSITORS],
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RewardsError {
    /// Amount argument was zero
    ZeroAmount,

    /// First deposit into an empty pool is below `min_initial_deposit`
    MinimumInitialDeposit,

    /// Withdrawal exceeds the deposited balance
    InsufficientBalance,

    /// Nothing to claim
    NoRewards,

    /// Claimant has queued ledger exits
    ExitPending,

    /// Epoch boundary not reached yet
    EpochNotReady,

    /// No free slot for a new depositor
    DepositorsFull,

    /// Arithmetic overflow
    Overflow,
}

pub type Result<T> = core::result::Result<T, RewardsError>;

/// Global accumulator state after settling at some timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlobalSettlement {
    pub acc_per_share: u128,
    pub pending_rewards: u64,
    pub pending_penalties: u64,
    pub epoch_clock: i64,
    pub epoch: u64,
}

/// What a `notify_reward` did with its amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NotifyOutcome {
    /// Increase of `acc_per_share` caused by this call
    pub acc_increase: u128,
    /// Buffer left after distribution (zero-deposit deferral or dust)
    pub pending_rewards: u64,
}

#[inline]
fn add_u64(a: u64, b: u64) -> Result<u64> {
    a.checked_add(b).ok_or(RewardsError::Overflow)
}

#[inline]
fn to_u64(v: u128) -> Result<u64> {
    u64::try_from(v).map_err(|_| RewardsError::Overflow)
}

/// Move as much of `pending_rewards` as `total_deposits` can absorb into the
/// accumulator. The amount removed from the buffer is rounded up, so the sum
/// of everything depositors can ever claim never exceeds what was removed.
fn distribute(s: &mut GlobalSettlement, total_deposits: u64) -> Result<()> {
    if total_deposits == 0 || s.pending_rewards == 0 {
        return Ok(());
    }
    let eff = total_deposits as u128;
    let inc = (s.pending_rewards as u128)
        .checked_mul(ACC_SCALE)
        .ok_or(RewardsError::Overflow)?
        / eff;
    if inc == 0 {
        return Ok(());
    }
    let priced = inc.checked_mul(eff).ok_or(RewardsError::Overflow)?;
    let consumed = to_u64((priced + ACC_SCALE - 1) / ACC_SCALE)?;
    s.acc_per_share = s
        .acc_per_share
        .checked_add(inc)
        .ok_or(RewardsError::Overflow)?;
    s.pending_rewards = s
        .pending_rewards
        .checked_sub(consumed)
        .ok_or(RewardsError::Overflow)?;
    Ok(())
}

// ============================================================================
// Core Implementation
// ============================================================================

impl RewardsEngine {
    /// Create a new engine by value (host/tests only; the struct is large).
    pub fn new(params: RewardsParams, now: i64) -> Self {
        let mut engine = Self::zeroed();
        engine.params = params;
        engine.epoch_clock = now;
        engine
    }

    /// Initialize in place over slab memory without a stack temporary.
    pub fn init_in_place(&mut self, params: RewardsParams, now: i64) {
        bytemuck::bytes_of_mut(self).fill(0);
        self.params = params;
        self.epoch_clock = now;
    }

    // ========================================
    // Bitmap Helpers
    // ========================================

    fn set_used(&mut self, idx: usize) {
        self.used[idx >> 6] |= 1u64 << (idx & 63);
    }

    fn first_free(&self) -> Option<usize> {
        for (w, word) in self.used.iter().enumerate() {
            if *word != u64::MAX {
                let idx = (w << 6) + (!*word).trailing_zeros() as usize;
                return (idx < MAX_DEPOSITORS).then_some(idx);
            }
        }
        None
    }

    fn for_each_used<F: FnMut(usize, &Depositor)>(&self, mut f: F) {
        for (w, word) in self.used.iter().enumerate() {
            let mut bits = *word;
            while bits != 0 {
                let idx = (w << 6) + bits.trailing_zeros() as usize;
                if idx < MAX_DEPOSITORS {
                    f(idx, &self.depositors[idx]);
                }
                bits &= bits - 1;
            }
        }
    }

    pub fn find_depositor(&self, owner: &[u8; 32]) -> Option<usize> {
        let mut found = None;
        self.for_each_used(|idx, d| {
            if found.is_none() && &d.owner == owner {
                found = Some(idx);
            }
        });
        found
    }

    // ========================================
    // Settlement
    // ========================================

    pub fn epoch_due(&self, now: i64) -> bool {
        let duration = self.params.epoch_duration.min(i64::MAX as u64) as i64;
        now >= self.epoch_clock.saturating_add(duration)
    }

    /// Global settlement at `now`, computed without writing anything.
    pub fn project_global(&self, now: i64) -> Result<GlobalSettlement> {
        let mut s = GlobalSettlement {
            acc_per_share: self.acc_per_share.get(),
            pending_rewards: self.pending_rewards,
            pending_penalties: self.pending_penalties,
            epoch_clock: self.epoch_clock,
            epoch: self.epoch,
        };

        let epoch_due = self.epoch_due(now);
        if s.pending_penalties >= self.params.min_penalty_flush || epoch_due {
            s.pending_rewards = add_u64(s.pending_rewards, s.pending_penalties)?;
            s.pending_penalties = 0;
        }
        if epoch_due {
            s.epoch_clock = now;
            s.epoch = add_u64(s.epoch, 1)?;
        }

        distribute(&mut s, self.total_deposits)?;
        Ok(s)
    }

    fn commit_global(&mut self, s: &GlobalSettlement) {
        debug_assert!(s.acc_per_share >= self.acc_per_share.get());
        self.acc_per_share = U128::new(s.acc_per_share);
        self.pending_rewards = s.pending_rewards;
        self.pending_penalties = s.pending_penalties;
        self.epoch_clock = s.epoch_clock;
        self.epoch = s.epoch;
    }

    /// Reward accrued by `d` since its checkpoint, at accumulator `acc`.
    fn accrued(d: &Depositor, acc: u128) -> Result<u64> {
        let delta = acc
            .checked_sub(d.acc_checkpoint.get())
            .ok_or(RewardsError::Overflow)?;
        let scaled = (d.balance as u128)
            .checked_mul(delta)
            .ok_or(RewardsError::Overflow)?;
        to_u64(scaled / ACC_SCALE)
    }

    /// `unclaimed` after settling `d` at accumulator `acc`.
    fn settled_unclaimed(d: &Depositor, acc: u128) -> Result<u64> {
        add_u64(d.unclaimed, Self::accrued(d, acc)?)
    }

    // ========================================
    // Operations
    // ========================================

    pub fn deposit(&mut self, owner: &[u8; 32], amount: u64, now: i64) -> Result<()> {
        if amount == 0 {
            return Err(RewardsError::ZeroAmount);
        }
        if self.total_deposits == 0 && amount < self.params.min_initial_deposit {
            return Err(RewardsError::MinimumInitialDeposit);
        }
        let g = self.project_global(now)?;

        let existing = self.find_depositor(owner);
        let slot = match existing {
            Some(idx) => idx,
            None => self.first_free().ok_or(RewardsError::DepositorsFull)?,
        };
        let current = match existing {
            Some(idx) => self.depositors[idx],
            None => Depositor {
                owner: *owner,
                ..Depositor::zeroed()
            },
        };

        let unclaimed = Self::settled_unclaimed(&current, g.acc_per_share)?;
        let balance = add_u64(current.balance, amount)?;
        let total = add_u64(self.total_deposits, amount)?;

        self.commit_global(&g);
        if existing.is_none() {
            self.set_used(slot);
            self.num_depositors += 1;
        }
        self.depositors[slot] = Depositor {
            owner: *owner,
            balance,
            unclaimed,
            acc_checkpoint: U128::new(g.acc_per_share),
        };
        self.total_deposits = total;
        Ok(())
    }

    pub fn withdraw(&mut self, owner: &[u8; 32], amount: u64, now: i64) -> Result<()> {
        if amount == 0 {
            return Err(RewardsError::ZeroAmount);
        }
        let idx = self
            .find_depositor(owner)
            .ok_or(RewardsError::InsufficientBalance)?;
        let current = self.depositors[idx];
        if current.balance < amount {
            return Err(RewardsError::InsufficientBalance);
        }
        let g = self.project_global(now)?;

        let unclaimed = Self::settled_unclaimed(&current, g.acc_per_share)?;
        let balance = current.balance - amount;
        let total = self
            .total_deposits
            .checked_sub(amount)
            .ok_or(RewardsError::Overflow)?;

        self.commit_global(&g);
        let d = &mut self.depositors[idx];
        d.balance = balance;
        d.unclaimed = unclaimed;
        d.acc_checkpoint = U128::new(g.acc_per_share);
        self.total_deposits = total;
        Ok(())
    }

    /// Settle and zero the owner's reward. `exit_queue_len` is the owner's
    /// ledger exit-queue length (only consulted under `ClaimGate::ExitQueueEmpty`).
    /// Returns the amount to pay out.
    pub fn claim(&mut self, owner: &[u8; 32], now: i64, exit_queue_len: usize) -> Result<u64> {
        let idx = self.find_depositor(owner).ok_or(RewardsError::NoRewards)?;
        let current = self.depositors[idx];
        let g = self.project_global(now)?;

        let payout = Self::settled_unclaimed(&current, g.acc_per_share)?;
        if payout == 0 {
            return Err(RewardsError::NoRewards);
        }
        if !self.params.claim_gate().allows(exit_queue_len) {
            return Err(RewardsError::ExitPending);
        }
        let total_claimed = add_u64(self.total_claimed, payout)?;

        self.commit_global(&g);
        let d = &mut self.depositors[idx];
        d.unclaimed = 0;
        d.acc_checkpoint = U128::new(g.acc_per_share);
        self.total_claimed = total_claimed;
        Ok(payout)
    }

    /// Revenue notification. Distributes immediately when anything is
    /// deposited, otherwise buffers into `pending_rewards`.
    pub fn notify_reward(&mut self, amount: u64, now: i64) -> Result<NotifyOutcome> {
        if amount == 0 {
            return Err(RewardsError::ZeroAmount);
        }
        let mut g = self.project_global(now)?;
        let acc_before = g.acc_per_share;
        g.pending_rewards = add_u64(g.pending_rewards, amount)?;
        distribute(&mut g, self.total_deposits)?;
        let total_in = add_u64(self.total_reward_in, amount)?;

        self.commit_global(&g);
        self.total_reward_in = total_in;
        Ok(NotifyOutcome {
            acc_increase: g.acc_per_share - acc_before,
            pending_rewards: g.pending_rewards,
        })
    }

    /// Penalty notification. Buffers only; the flush happens on a later
    /// settlement once the threshold or epoch boundary is reached.
    pub fn add_pending_penalty(&mut self, amount: u64, now: i64) -> Result<u64> {
        if amount == 0 {
            return Err(RewardsError::ZeroAmount);
        }
        let mut g = self.project_global(now)?;
        g.pending_penalties = add_u64(g.pending_penalties, amount)?;
        let total_in = add_u64(self.total_reward_in, amount)?;

        self.commit_global(&g);
        self.total_reward_in = total_in;
        Ok(g.pending_penalties)
    }

    /// Explicit epoch crank. Returns the new epoch number.
    pub fn advance_epoch(&mut self, now: i64) -> Result<u64> {
        if !self.epoch_due(now) {
            return Err(RewardsError::EpochNotReady);
        }
        let g = self.project_global(now)?;
        self.commit_global(&g);
        Ok(g.epoch)
    }

    /// Reward a `claim` at `now` would pay, computed without mutating state.
    pub fn pending_rewards_of(&self, owner: &[u8; 32], now: i64) -> Result<u64> {
        let Some(idx) = self.find_depositor(owner) else {
            return Ok(0);
        };
        let g = self.project_global(now)?;
        Self::settled_unclaimed(&self.depositors[idx], g.acc_per_share)
    }

    // ========================================
    // Utilities
    // ========================================

    /// Check deposit and reward conservation:
    /// - `total_deposits == sum(balance)`
    /// - claimed + owed + buffered never exceeds what was received
    pub fn check_conservation(&self) -> bool {
        let acc = self.acc_per_share.get();
        let mut balances = 0u128;
        let mut owed = 0u128;
        let mut count = 0u64;
        let mut ok = true;
        self.for_each_used(|_idx, d| {
            count += 1;
            balances += d.balance as u128;
            match Self::accrued(d, acc) {
                Ok(accrued) => owed += d.unclaimed as u128 + accrued as u128,
                Err(_) => ok = false,
            }
        });
        let accounted = owed
            + self.total_claimed as u128
            + self.pending_rewards as u128
            + self.pending_penalties as u128;
        ok && count == self.num_depositors
            && balances == self.total_deposits as u128
            && accounted <= self.total_reward_in as u128
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: [u8; 32] = [1; 32];
    const BOB: [u8; 32] = [2; 32];
    const EPOCH: u64 = 86_400;

    fn params(gate: ClaimGate) -> RewardsParams {
        RewardsParams {
            epoch_duration: EPOCH,
            min_initial_deposit: 100,
            min_penalty_flush: 1_000,
            claim_gate: gate as u64,
        }
    }

    fn engine() -> RewardsEngine {
        RewardsEngine::new(params(ClaimGate::Open), 0)
    }

    #[test]
    fn equal_depositors_split_reward() {
        let mut e = engine();
        e.deposit(&ALICE, 500, 0).unwrap();
        e.deposit(&BOB, 500, 0).unwrap();
        e.notify_reward(100, 1).unwrap();
        assert_eq!(e.pending_rewards_of(&ALICE, 1), Ok(50));
        assert_eq!(e.claim(&ALICE, 1, 0), Ok(50));
        assert_eq!(e.claim(&BOB, 1, 0), Ok(50));
        assert_eq!(e.claim(&BOB, 1, 0), Err(RewardsError::NoRewards));
        assert!(e.check_conservation());
    }

    #[test]
    fn first_deposit_minimum() {
        let mut e = engine();
        assert_eq!(e.deposit(&ALICE, 99, 0), Err(RewardsError::MinimumInitialDeposit));
        e.deposit(&ALICE, 100, 0).unwrap();
        // Once the pool is non-empty small deposits are fine.
        e.deposit(&BOB, 1, 0).unwrap();
        assert_eq!(e.total_deposits, 101);
    }

    #[test]
    fn reward_buffers_without_deposits() {
        let mut e = engine();
        let out = e.notify_reward(300, 0).unwrap();
        assert_eq!(out.acc_increase, 0);
        assert_eq!(e.pending_rewards, 300);
        e.deposit(&ALICE, 1_000, 1).unwrap();
        // Flushed on the next settlement to the sole depositor.
        assert_eq!(e.pending_rewards_of(&ALICE, 2), Ok(300));
        assert_eq!(e.claim(&ALICE, 2, 0), Ok(300));
        assert_eq!(e.pending_rewards, 0);
    }

    #[test]
    fn dust_stays_buffered() {
        let mut e = engine();
        e.deposit(&ALICE, 1_000, 0).unwrap();
        e.deposit(&BOB, 2_000, 0).unwrap();
        e.notify_reward(10, 0).unwrap();
        // inc = 10e18 / 3000, priced back at ceil(inc * 3000 / 1e18) = 10
        assert!(e.pending_rewards <= 10);
        let a = e.pending_rewards_of(&ALICE, 0).unwrap();
        let b = e.pending_rewards_of(&BOB, 0).unwrap();
        assert!(a + b <= 10);
        assert!(a + b >= 8);
        assert!(e.check_conservation());
    }

    #[test]
    fn penalties_flush_at_threshold() {
        let mut e = engine();
        e.deposit(&ALICE, 1_000, 0).unwrap();
        e.add_pending_penalty(600, 1).unwrap();
        assert_eq!(e.pending_rewards_of(&ALICE, 2), Ok(0));
        e.add_pending_penalty(600, 2).unwrap();
        // Buffer is 1200 >= 1000: the next settlement flushes it.
        assert_eq!(e.pending_penalties, 1_200);
        assert_eq!(e.pending_rewards_of(&ALICE, 3), Ok(1_200));
        e.withdraw(&ALICE, 1, 3).unwrap();
        assert_eq!(e.pending_penalties, 0);
    }

    #[test]
    fn penalties_flush_at_epoch_boundary() {
        let mut e = engine();
        e.deposit(&ALICE, 1_000, 0).unwrap();
        e.add_pending_penalty(10, 5).unwrap();
        assert_eq!(e.advance_epoch(EPOCH as i64 - 1), Err(RewardsError::EpochNotReady));
        assert_eq!(e.pending_rewards_of(&ALICE, EPOCH as i64), Ok(10));
        assert_eq!(e.advance_epoch(EPOCH as i64), Ok(1));
        assert_eq!(e.epoch_clock, EPOCH as i64);
        assert_eq!(e.pending_penalties, 0);
        assert_eq!(e.claim(&ALICE, EPOCH as i64, 0), Ok(10));
    }

    #[test]
    fn claim_gate_blocks_during_exit() {
        let mut e = RewardsEngine::new(params(ClaimGate::ExitQueueEmpty), 0);
        e.deposit(&ALICE, 1_000, 0).unwrap();
        e.notify_reward(100, 0).unwrap();
        let before = e;
        assert_eq!(e.claim(&ALICE, 0, 1), Err(RewardsError::ExitPending));
        assert_eq!(e, before);
        assert_eq!(e.claim(&ALICE, 0, 0), Ok(100));
    }

    #[test]
    fn withdraw_keeps_accrued_reward() {
        let mut e = engine();
        e.deposit(&ALICE, 1_000, 0).unwrap();
        e.notify_reward(100, 0).unwrap();
        e.withdraw(&ALICE, 1_000, 1).unwrap();
        assert_eq!(e.total_deposits, 0);
        e.notify_reward(50, 2).unwrap();
        assert_eq!(e.pending_rewards, 50);
        assert_eq!(e.claim(&ALICE, 2, 0), Ok(100));
        assert_eq!(e.withdraw(&ALICE, 1, 3), Err(RewardsError::InsufficientBalance));
    }

    #[test]
    fn late_depositor_gets_nothing_from_earlier_rewards() {
        let mut e = engine();
        e.deposit(&ALICE, 1_000, 0).unwrap();
        e.notify_reward(100, 0).unwrap();
        e.deposit(&BOB, 1_000, 1).unwrap();
        assert_eq!(e.pending_rewards_of(&BOB, 1), Ok(0));
        e.notify_reward(100, 2).unwrap();
        assert_eq!(e.pending_rewards_of(&ALICE, 2), Ok(150));
        assert_eq!(e.pending_rewards_of(&BOB, 2), Ok(50));
    }

    #[test]
    fn thin_pool_accumulator_admits_large_deposits() {
        let mut e = engine();
        e.deposit(&ALICE, 100, 0).unwrap();
        e.notify_reward(1_000_000_000_000, 0).unwrap();
        assert_eq!(e.acc_per_share.get(), 10_000_000_000 * ACC_SCALE);

        e.deposit(&BOB, 100_000_000_000, 1).unwrap();
        assert_eq!(e.pending_rewards_of(&BOB, 1), Ok(0));
        e.notify_reward(1_000_000_000_000, 2).unwrap();

        // Bob holds 1e11 of 1e11 + 100 deposited.
        let bob = e.pending_rewards_of(&BOB, 2).unwrap();
        assert!(bob >= 999_999_999_000 && bob <= 1_000_000_000_000);
        assert_eq!(e.claim(&ALICE, 2, 0), Ok(1_000_000_000_000 + 999));
        assert_eq!(e.claim(&BOB, 2, 0), Ok(bob));
        e.deposit(&BOB, u64::MAX / 4, 3).unwrap();
        e.withdraw(&BOB, u64::MAX / 4, 4).unwrap();
        assert!(e.check_conservation());
    }

    #[test]
    fn zero_amounts_rejected() {
        let mut e = engine();
        assert_eq!(e.deposit(&ALICE, 0, 0), Err(RewardsError::ZeroAmount));
        assert_eq!(e.withdraw(&ALICE, 0, 0), Err(RewardsError::ZeroAmount));
        assert_eq!(e.notify_reward(0, 0), Err(RewardsError::ZeroAmount));
        assert_eq!(e.add_pending_penalty(0, 0), Err(RewardsError::ZeroAmount));
    }

    #[test]
    fn unknown_claim_gate_fails_closed() {
        let mut p = params(ClaimGate::Open);
        p.claim_gate = 7;
        assert_eq!(p.claim_gate(), ClaimGate::ExitQueueEmpty);
    }
}
