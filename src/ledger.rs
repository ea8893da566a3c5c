//! Stake ledger engine
//!
//! Tracks staked principal per owner, the global backing total, and a bounded
//! exit queue per position. Token movement (base asset in/out, receipt
//! mint/burn/escrow) belongs to the program wrapper; this module only decides
//! whether an operation is allowed and what it does to the books.
//!
//! Every public mutator checks all of its preconditions before writing, so an
//! `Err` return leaves the engine byte-identical to its prior state.
//!
//! Invariants (see `check_conservation`):
//! 1. `total_backing == sum(principal)` over all positions
//! 2. `sum(queued exits) <= principal` for every position
//! 3. `queue_len <= MAX_EXIT_REQUESTS`

use bytemuck::{Pod, Zeroable};

// ============================================================================
// Constants
// ============================================================================

// Table size is feature-configured, not target-configured, so host and SBF
// builds agree on the slab layout for a given feature set.
#[cfg(kani)]
pub const MAX_STAKERS: usize = 4;

#[cfg(all(feature = "test", not(kani)))]
pub const MAX_STAKERS: usize = 64;

#[cfg(all(not(kani), not(feature = "test")))]
pub const MAX_STAKERS: usize = 1024;

pub const BITMAP_WORDS: usize = (MAX_STAKERS + 63) / 64;

/// Exit requests a single position may have outstanding.
pub const MAX_EXIT_REQUESTS: usize = 8;

pub const BPS_DENOMINATOR: u64 = 10_000;

// ============================================================================
// Core Data Structures
// ============================================================================

/// A queued withdrawal. The matching receipt amount sits in ledger escrow
/// until the request is cancelled, exited or instant-exited.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct ExitRequest {
    pub amount: u64,
    /// Unix timestamp (seconds) at which the request was queued
    pub initiated_at: i64,
}

impl ExitRequest {
    /// First timestamp at which a normal `exit` is allowed.
    pub fn unlocks_at(&self, lock_duration: u64) -> i64 {
        self.initiated_at.saturating_add(lock_duration.min(i64::MAX as u64) as i64)
    }

    pub fn is_unlocked(&self, now: i64, lock_duration: u64) -> bool {
        now >= self.unlocks_at(lock_duration)
    }
}

/// Per-owner staking position.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct Position {
    /// Owner pubkey (signature checks done by wrapper)
    pub owner: [u8; 32],

    /// Base asset staked and not yet withdrawn (queued exits included)
    pub principal: u64,

    /// Live entries at the front of `exits`
    pub queue_len: u64,

    /// Exit queue. Only `exits[..queue_len]` is meaningful.
    pub exits: [ExitRequest; MAX_EXIT_REQUESTS],
}

impl Position {
    pub fn exit_queue(&self) -> &[ExitRequest] {
        let len = (self.queue_len as usize).min(MAX_EXIT_REQUESTS);
        &self.exits[..len]
    }

    /// Sum of all queued exit amounts.
    pub fn queued_amount(&self) -> u64 {
        self.exit_queue()
            .iter()
            .fold(0u64, |acc, r| acc.saturating_add(r.amount))
    }

    /// Principal not yet committed to an exit request.
    pub fn unqueued_principal(&self) -> u64 {
        self.principal.saturating_sub(self.queued_amount())
    }

    fn push_exit(&mut self, request: ExitRequest) -> usize {
        let idx = self.queue_len as usize;
        self.exits[idx] = request;
        self.queue_len += 1;
        idx
    }

    /// Swap-with-last removal. The former tail entry takes over `index`, so
    /// indices of the remaining entries are not stable across removals.
    fn remove_exit(&mut self, index: usize) -> ExitRequest {
        let last = self.queue_len as usize - 1;
        let removed = self.exits[index];
        self.exits[index] = self.exits[last];
        self.exits[last] = ExitRequest::zeroed();
        self.queue_len -= 1;
        removed
    }
}

/// Construction-time ledger parameters. Immutable after init.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct LedgerParams {
    /// Seconds an exit request must wait before a penalty-free `exit`
    pub lock_duration: u64,

    /// Penalty charged on `instant_exit`, in basis points (0..=10_000)
    pub instant_exit_penalty_bps: u64,
}

/// Ledger engine state - fixed table with bitmap
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct LedgerEngine {
    pub params: LedgerParams,

    /// Sum of principal over all positions
    pub total_backing: u64,

    /// Occupied slots in `positions`
    pub num_positions: u64,

    pub used: [u64; BITMAP_WORDS],

    pub positions: [Position; MAX_STAKERS],
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerError {
    /// Amount argument was zero
    ZeroAmount,

    /// All principal is already queued for exit (or nothing is staked)
    NothingToInitiate,

    /// Requested exit exceeds principal not yet queued
    AmountExceedsStake,

    /// Caller no longer holds enough receipt tokens to escrow
    InsufficientReceipt,

    /// Exit queue already holds MAX_EXIT_REQUESTS entries
    ExitQueueFull,

    /// Exit queue index out of bounds
    InvalidIndex,

    /// Lock period has not elapsed yet
    Locked,

    /// Lock period has elapsed; use a normal exit instead
    Unlocked,

    /// A penalty is due but no rewards sink is configured
    RewardsSinkNotSet,

    /// No free slot for a new position
    LedgerFull,

    /// Arithmetic overflow
    Overflow,
}

pub type Result<T> = core::result::Result<T, LedgerError>;

/// Result of a penalized early withdrawal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstantExitOutcome {
    pub request: ExitRequest,
    /// Routed to the rewards sink
    pub penalty: u64,
    /// Paid to the owner
    pub payout: u64,
}

/// Penalty on an instant exit. Truncating division: dust amounts can carry a
/// zero penalty.
pub fn instant_exit_penalty(amount: u64, penalty_bps: u64) -> u64 {
    ((amount as u128 * penalty_bps as u128) / BPS_DENOMINATOR as u128) as u64
}

// ============================================================================
// Core Implementation
// ============================================================================

impl LedgerEngine {
    /// Create a new engine by value (host/tests only; the struct is large).
    pub fn new(params: LedgerParams) -> Self {
        let mut engine = Self::zeroed();
        engine.params = params;
        engine
    }

    /// Initialize in place over slab memory without a stack temporary.
    pub fn init_in_place(&mut self, params: LedgerParams) {
        bytemuck::bytes_of_mut(self).fill(0);
        self.params = params;
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
                return (idx < MAX_STAKERS).then_some(idx);
            }
        }
        None
    }

    fn for_each_used<F: FnMut(usize, &Position)>(&self, mut f: F) {
        for (w, word) in self.used.iter().enumerate() {
            let mut bits = *word;
            while bits != 0 {
                let b = bits.trailing_zeros() as usize;
                let idx = (w << 6) + b;
                if idx < MAX_STAKERS {
                    f(idx, &self.positions[idx]);
                }
                bits &= bits - 1;
            }
        }
    }

    // ========================================
    // Queries
    // ========================================

    pub fn find_position(&self, owner: &[u8; 32]) -> Option<usize> {
        let mut found = None;
        self.for_each_used(|idx, p| {
            if found.is_none() && &p.owner == owner {
                found = Some(idx);
            }
        });
        found
    }

    pub fn position(&self, owner: &[u8; 32]) -> Option<&Position> {
        self.find_position(owner).map(|idx| &self.positions[idx])
    }

    pub fn principal_of(&self, owner: &[u8; 32]) -> u64 {
        self.position(owner).map_or(0, |p| p.principal)
    }

    pub fn exit_queue(&self, owner: &[u8; 32]) -> &[ExitRequest] {
        match self.find_position(owner) {
            Some(idx) => self.positions[idx].exit_queue(),
            None => &[],
        }
    }

    /// Cross-component query used by the rewards claim gate.
    pub fn exit_queue_len(&self, owner: &[u8; 32]) -> usize {
        self.exit_queue(owner).len()
    }

    pub fn penalty_for(&self, amount: u64) -> u64 {
        instant_exit_penalty(amount, self.params.instant_exit_penalty_bps)
    }

    fn request_at(&self, owner: &[u8; 32], index: usize) -> Result<(usize, ExitRequest)> {
        let idx = self.find_position(owner).ok_or(LedgerError::InvalidIndex)?;
        let request = *self.positions[idx]
            .exit_queue()
            .get(index)
            .ok_or(LedgerError::InvalidIndex)?;
        Ok((idx, request))
    }

    // ========================================
    // Operations
    // ========================================

    /// Add `amount` to the owner's principal, opening a position on first
    /// stake. Returns the new principal.
    pub fn stake(&mut self, owner: &[u8; 32], amount: u64) -> Result<u64> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let existing = self.find_position(owner);
        let slot = match existing {
            Some(idx) => idx,
            None => self.first_free().ok_or(LedgerError::LedgerFull)?,
        };
        let current = existing.map_or(0, |idx| self.positions[idx].principal);
        let new_principal = current.checked_add(amount).ok_or(LedgerError::Overflow)?;
        let new_total = self
            .total_backing
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        if existing.is_none() {
            self.positions[slot] = Position::zeroed();
            self.positions[slot].owner = *owner;
            self.set_used(slot);
            self.num_positions += 1;
        }
        self.positions[slot].principal = new_principal;
        self.total_backing = new_total;
        Ok(new_principal)
    }

    /// Queue an exit of `amount`. `receipt_balance` is the owner's current
    /// receipt-token balance; the wrapper escrows `amount` of it on success.
    /// Returns the index of the new request.
    pub fn initiate_exit(
        &mut self,
        owner: &[u8; 32],
        amount: u64,
        receipt_balance: u64,
        now: i64,
    ) -> Result<usize> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let idx = self
            .find_position(owner)
            .ok_or(LedgerError::NothingToInitiate)?;
        let position = &self.positions[idx];

        let queued = position.queued_amount();
        if position.principal <= queued {
            return Err(LedgerError::NothingToInitiate);
        }
        if amount > position.principal - queued {
            return Err(LedgerError::AmountExceedsStake);
        }
        if receipt_balance < amount {
            return Err(LedgerError::InsufficientReceipt);
        }
        if position.exit_queue().len() >= MAX_EXIT_REQUESTS {
            return Err(LedgerError::ExitQueueFull);
        }

        Ok(self.positions[idx].push_exit(ExitRequest {
            amount,
            initiated_at: now,
        }))
    }

    /// Drop a queued request. The wrapper returns its escrowed receipts.
    pub fn cancel_exit(&mut self, owner: &[u8; 32], index: usize) -> Result<ExitRequest> {
        let (idx, _) = self.request_at(owner, index)?;
        Ok(self.positions[idx].remove_exit(index))
    }

    /// Complete an unlocked request. Succeeds at exactly
    /// `now == initiated_at + lock_duration`.
    pub fn exit(&mut self, owner: &[u8; 32], index: usize, now: i64) -> Result<ExitRequest> {
        let (idx, request) = self.request_at(owner, index)?;
        if !request.is_unlocked(now, self.params.lock_duration) {
            return Err(LedgerError::Locked);
        }
        self.release(idx, index, request.amount)?;
        Ok(request)
    }

    /// Complete a still-locked request early, charging the penalty.
    /// `sink_configured` reports whether a rewards sink can receive it.
    pub fn instant_exit(
        &mut self,
        owner: &[u8; 32],
        index: usize,
        now: i64,
        sink_configured: bool,
    ) -> Result<InstantExitOutcome> {
        let outcome = self.quote_instant_exit(owner, index, now)?;
        if outcome.penalty > 0 && !sink_configured {
            return Err(LedgerError::RewardsSinkNotSet);
        }
        let idx = self
            .find_position(owner)
            .ok_or(LedgerError::InvalidIndex)?;
        self.release(idx, index, outcome.request.amount)?;
        Ok(outcome)
    }

    /// Penalty split an `instant_exit` at `now` would produce, without
    /// touching state.
    pub fn quote_instant_exit(
        &self,
        owner: &[u8; 32],
        index: usize,
        now: i64,
    ) -> Result<InstantExitOutcome> {
        let (_, request) = self.request_at(owner, index)?;
        if request.is_unlocked(now, self.params.lock_duration) {
            return Err(LedgerError::Unlocked);
        }
        let penalty = self.penalty_for(request.amount);
        let payout = request
            .amount
            .checked_sub(penalty)
            .ok_or(LedgerError::Overflow)?;
        Ok(InstantExitOutcome {
            request,
            penalty,
            payout,
        })
    }

    fn release(&mut self, idx: usize, index: usize, amount: u64) -> Result<()> {
        let principal = self.positions[idx]
            .principal
            .checked_sub(amount)
            .ok_or(LedgerError::Overflow)?;
        let total = self
            .total_backing
            .checked_sub(amount)
            .ok_or(LedgerError::Overflow)?;

        self.positions[idx].remove_exit(index);
        self.positions[idx].principal = principal;
        self.total_backing = total;
        Ok(())
    }

    // ========================================
    // Utilities
    // ========================================

    /// Check the ledger accounting invariants.
    pub fn check_conservation(&self) -> bool {
        let mut sum = 0u128;
        let mut ok = true;
        let mut count = 0u64;
        self.for_each_used(|_idx, p| {
            count += 1;
            sum += p.principal as u128;
            if p.queue_len as usize > MAX_EXIT_REQUESTS {
                ok = false;
                return;
            }
            let queued: u128 = p.exit_queue().iter().map(|r| r.amount as u128).sum();
            if queued > p.principal as u128 {
                ok = false;
            }
        });
        ok && count == self.num_positions && sum == self.total_backing as u128
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: [u8; 32] = [1; 32];
    const BOB: [u8; 32] = [2; 32];
    const LOCK: u64 = 7 * 24 * 3600;

    fn engine(bps: u64) -> LedgerEngine {
        LedgerEngine::new(LedgerParams {
            lock_duration: LOCK,
            instant_exit_penalty_bps: bps,
        })
    }

    #[test]
    fn stake_opens_position_and_tracks_backing() {
        let mut e = engine(5000);
        assert_eq!(e.stake(&ALICE, 100), Ok(100));
        assert_eq!(e.stake(&ALICE, 50), Ok(150));
        assert_eq!(e.stake(&BOB, 10), Ok(10));
        assert_eq!(e.total_backing, 160);
        assert_eq!(e.num_positions, 2);
        assert!(e.check_conservation());
    }

    #[test]
    fn stake_zero_rejected() {
        let mut e = engine(0);
        assert_eq!(e.stake(&ALICE, 0), Err(LedgerError::ZeroAmount));
        assert_eq!(e.num_positions, 0);
    }

    #[test]
    fn full_exit_after_lock() {
        let mut e = engine(5000);
        e.stake(&ALICE, 100).unwrap();
        assert_eq!(e.initiate_exit(&ALICE, 100, 100, 1_000), Ok(0));
        assert_eq!(e.exit(&ALICE, 0, 1_000 + LOCK as i64 - 1), Err(LedgerError::Locked));
        let req = e.exit(&ALICE, 0, 1_000 + LOCK as i64).unwrap();
        assert_eq!(req.amount, 100);
        assert_eq!(e.principal_of(&ALICE), 0);
        assert_eq!(e.total_backing, 0);
        assert_eq!(e.exit_queue_len(&ALICE), 0);
        assert!(e.check_conservation());
    }

    #[test]
    fn instant_exit_half_penalty() {
        let mut e = engine(5000);
        e.stake(&ALICE, 100).unwrap();
        e.initiate_exit(&ALICE, 100, 100, 10).unwrap();
        let out = e.instant_exit(&ALICE, 0, 11, true).unwrap();
        assert_eq!(out.penalty, 50);
        assert_eq!(out.payout, 50);
        assert_eq!(e.total_backing, 0);
    }

    #[test]
    fn instant_exit_requires_sink_only_when_penalty_due() {
        let mut e = engine(100);
        e.stake(&ALICE, 1_000).unwrap();
        e.initiate_exit(&ALICE, 99, 1_000, 0).unwrap();
        e.initiate_exit(&ALICE, 500, 1_000, 0).unwrap();

        // 99 * 100 / 10_000 truncates to zero: no sink needed.
        let out = e.instant_exit(&ALICE, 0, 1, false).unwrap();
        assert_eq!((out.penalty, out.payout), (0, 99));

        let before = e;
        assert_eq!(e.instant_exit(&ALICE, 0, 1, false), Err(LedgerError::RewardsSinkNotSet));
        assert_eq!(e, before);
    }

    #[test]
    fn instant_exit_after_unlock_rejected() {
        let mut e = engine(5000);
        e.stake(&ALICE, 100).unwrap();
        e.initiate_exit(&ALICE, 100, 100, 0).unwrap();
        assert_eq!(e.instant_exit(&ALICE, 0, LOCK as i64, true), Err(LedgerError::Unlocked));
    }

    #[test]
    fn initiate_exit_precondition_order() {
        let mut e = engine(0);
        assert_eq!(e.initiate_exit(&ALICE, 1, 1, 0), Err(LedgerError::NothingToInitiate));
        e.stake(&ALICE, 100).unwrap();
        assert_eq!(e.initiate_exit(&ALICE, 0, 100, 0), Err(LedgerError::ZeroAmount));
        e.initiate_exit(&ALICE, 60, 100, 0).unwrap();
        assert_eq!(e.initiate_exit(&ALICE, 41, 40, 0), Err(LedgerError::AmountExceedsStake));
        assert_eq!(e.initiate_exit(&ALICE, 40, 39, 0), Err(LedgerError::InsufficientReceipt));
        e.initiate_exit(&ALICE, 40, 40, 0).unwrap();
        assert_eq!(e.initiate_exit(&ALICE, 1, 100, 0), Err(LedgerError::NothingToInitiate));
    }

    #[test]
    fn exit_queue_capacity() {
        let mut e = engine(0);
        e.stake(&ALICE, 100).unwrap();
        for i in 0..MAX_EXIT_REQUESTS {
            assert_eq!(e.initiate_exit(&ALICE, 1, 100, i as i64), Ok(i));
        }
        assert_eq!(e.initiate_exit(&ALICE, 1, 100, 0), Err(LedgerError::ExitQueueFull));
    }

    #[test]
    fn cancel_non_tail_moves_last_entry_into_slot() {
        let mut e = engine(0);
        e.stake(&ALICE, 100).unwrap();
        e.initiate_exit(&ALICE, 10, 100, 0).unwrap();
        e.initiate_exit(&ALICE, 20, 100, 1).unwrap();
        e.initiate_exit(&ALICE, 30, 100, 2).unwrap();

        let removed = e.cancel_exit(&ALICE, 0).unwrap();
        assert_eq!(removed.amount, 10);
        let q = e.exit_queue(&ALICE);
        assert_eq!(q.len(), 2);
        // Former tail (30) now sits at index 0; 20 keeps index 1.
        assert_eq!(q[0], ExitRequest { amount: 30, initiated_at: 2 });
        assert_eq!(q[1], ExitRequest { amount: 20, initiated_at: 1 });
        assert_eq!(e.principal_of(&ALICE), 100);
    }

    #[test]
    fn out_of_bounds_index() {
        let mut e = engine(0);
        assert_eq!(e.cancel_exit(&ALICE, 0), Err(LedgerError::InvalidIndex));
        e.stake(&ALICE, 10).unwrap();
        e.initiate_exit(&ALICE, 5, 10, 0).unwrap();
        assert_eq!(e.exit(&ALICE, 1, i64::MAX), Err(LedgerError::InvalidIndex));
        assert_eq!(e.instant_exit(&ALICE, 3, 0, true), Err(LedgerError::InvalidIndex));
    }

    #[test]
    fn lock_math_does_not_wrap() {
        let r = ExitRequest { amount: 1, initiated_at: i64::MAX - 5 };
        assert_eq!(r.unlocks_at(LOCK), i64::MAX);
        assert!(!r.is_unlocked(i64::MAX - 1, LOCK));
    }
}
