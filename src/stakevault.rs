//! Stakevault: Solana staking program with embedded ledger and rewards engines.
//!
//! Two slab kinds live under this program:
//! - a ledger slab (StakeLedger): base asset in, receipt token out 1:1, exit
//!   queue with lock period or basis-point instant-exit penalty
//! - a rewards slab (RewardsAccumulator): receipt deposits earn a pro-rata
//!   share of revenue and penalties through an accumulator-per-share
//!
//! The engines in `ledger` and `rewards` are pure accounting; this file does
//! account validation, token CPIs and instruction dispatch.

#![deny(unsafe_code)]

pub mod ledger;
pub mod rewards;
pub mod wide;

// 1. mod constants
pub mod constants {
    use crate::ledger::LedgerEngine;
    use crate::rewards::RewardsEngine;
    use crate::state::{LedgerConfig, RewardsConfig, SlabHeader};
    use core::mem::{align_of, size_of};

    pub const MAGIC: u64 = 0x0054_4c56_4b41_5453; // "STAKVLT\0"
    pub const VERSION: u32 = 1;

    pub const HEADER_LEN: usize = size_of::<SlabHeader>();
    pub const LEDGER_CONFIG_LEN: usize = size_of::<LedgerConfig>();
    pub const REWARDS_CONFIG_LEN: usize = size_of::<RewardsConfig>();

    pub const fn align_up(x: usize, a: usize) -> usize {
        (x + (a - 1)) & !(a - 1)
    }

    pub const LEDGER_ENGINE_OFF: usize =
        align_up(HEADER_LEN + LEDGER_CONFIG_LEN, align_of::<LedgerEngine>());
    pub const LEDGER_ENGINE_LEN: usize = size_of::<LedgerEngine>();
    pub const LEDGER_SLAB_LEN: usize = LEDGER_ENGINE_OFF + LEDGER_ENGINE_LEN;

    pub const REWARDS_ENGINE_OFF: usize =
        align_up(HEADER_LEN + REWARDS_CONFIG_LEN, align_of::<RewardsEngine>());
    pub const REWARDS_ENGINE_LEN: usize = size_of::<RewardsEngine>();
    pub const REWARDS_SLAB_LEN: usize = REWARDS_ENGINE_OFF + REWARDS_ENGINE_LEN;

    /// Authorized revenue sources per rewards slab
    pub const MAX_NOTIFIERS: usize = 8;

    pub const LEDGER_SEED: &[u8] = b"ledger";
    pub const REWARDS_SEED: &[u8] = b"rewards";
}

// 2. mod zc (zero-copy engine views)
pub mod zc {
    use crate::constants::{
        LEDGER_ENGINE_LEN, LEDGER_ENGINE_OFF, REWARDS_ENGINE_LEN, REWARDS_ENGINE_OFF,
    };
    use crate::ledger::LedgerEngine;
    use crate::rewards::RewardsEngine;
    use solana_program::program_error::ProgramError;

    #[inline]
    fn window(data: &[u8], off: usize, len: usize) -> Result<&[u8], ProgramError> {
        data.get(off..off + len).ok_or(ProgramError::InvalidAccountData)
    }

    #[inline]
    fn window_mut(data: &mut [u8], off: usize, len: usize) -> Result<&mut [u8], ProgramError> {
        data.get_mut(off..off + len)
            .ok_or(ProgramError::InvalidAccountData)
    }

    #[inline]
    pub fn ledger_ref(data: &[u8]) -> Result<&LedgerEngine, ProgramError> {
        bytemuck::try_from_bytes(window(data, LEDGER_ENGINE_OFF, LEDGER_ENGINE_LEN)?)
            .map_err(|_| ProgramError::InvalidAccountData)
    }

    #[inline]
    pub fn ledger_mut(data: &mut [u8]) -> Result<&mut LedgerEngine, ProgramError> {
        bytemuck::try_from_bytes_mut(window_mut(data, LEDGER_ENGINE_OFF, LEDGER_ENGINE_LEN)?)
            .map_err(|_| ProgramError::InvalidAccountData)
    }

    #[inline]
    pub fn rewards_ref(data: &[u8]) -> Result<&RewardsEngine, ProgramError> {
        bytemuck::try_from_bytes(window(data, REWARDS_ENGINE_OFF, REWARDS_ENGINE_LEN)?)
            .map_err(|_| ProgramError::InvalidAccountData)
    }

    #[inline]
    pub fn rewards_mut(data: &mut [u8]) -> Result<&mut RewardsEngine, ProgramError> {
        bytemuck::try_from_bytes_mut(window_mut(data, REWARDS_ENGINE_OFF, REWARDS_ENGINE_LEN)?)
            .map_err(|_| ProgramError::InvalidAccountData)
    }
}

// 3. mod error
pub mod error {
    use crate::ledger::LedgerError;
    use crate::rewards::RewardsError;
    use num_derive::FromPrimitive;
    use solana_program::{decode_error::DecodeError, program_error::ProgramError};
    use thiserror::Error;

    #[derive(Clone, Copy, Debug, Eq, PartialEq, Error, FromPrimitive)]
    pub enum StakeVaultError {
        #[error("Slab magic mismatch")]
        InvalidMagic,
        #[error("Unsupported slab version")]
        InvalidVersion,
        #[error("Slab already initialized")]
        AlreadyInitialized,
        #[error("Slab not initialized")]
        NotInitialized,
        #[error("Slab account has the wrong length")]
        InvalidSlabLen,
        #[error("Slab is of the wrong kind for this instruction")]
        InvalidSlabKind,
        #[error("Vault token account mismatch")]
        InvalidVault,
        #[error("Mint mismatch")]
        InvalidMint,
        #[error("Token account is not owned by the expected wallet or mint")]
        InvalidTokenAccount,
        #[error("Expected signer")]
        ExpectedSigner,
        #[error("Expected writable account")]
        ExpectedWritable,
        #[error("Caller lacks the required role")]
        Unauthorized,
        #[error("Slab is paused")]
        Paused,
        #[error("Basis points outside [0, 10000]")]
        InvalidBasisPoints,
        #[error("Duration must be positive and fit in i64")]
        InvalidDuration,
        #[error("Vault balance or receipt supply differs from total backing")]
        BackingMismatch,
        #[error("Rewards sink account mismatch")]
        InvalidRewardsSink,
        #[error("Stake ledger account mismatch")]
        InvalidStakeLedger,
        #[error("Stake ledger already registered")]
        StakeLedgerAlreadySet,
        #[error("Notifier table full")]
        NotifierTableFull,
        // Engine errors mapped:
        #[error("Amount must be non-zero")]
        ZeroAmount,
        #[error("Nothing left to queue for exit")]
        NothingToInitiate,
        #[error("Exit amount exceeds unqueued stake")]
        AmountExceedsStake,
        #[error("Receipt balance below exit amount")]
        InsufficientReceipt,
        #[error("Exit queue full")]
        ExitQueueFull,
        #[error("Exit request index out of bounds")]
        InvalidIndex,
        #[error("Exit request still locked")]
        Locked,
        #[error("Exit request already unlocked")]
        Unlocked,
        #[error("Penalty due but no rewards sink configured")]
        RewardsSinkNotSet,
        #[error("Ledger position table full")]
        LedgerFull,
        #[error("Initial deposit below minimum")]
        MinimumInitialDeposit,
        #[error("Insufficient deposited balance")]
        InsufficientBalance,
        #[error("No rewards to claim")]
        NoRewards,
        #[error("Claim blocked while exits are queued")]
        ExitPending,
        #[error("Epoch boundary not reached")]
        EpochNotReady,
        #[error("Depositor table full")]
        DepositorsFull,
        #[error("Arithmetic overflow")]
        Overflow,
    }

    impl From<StakeVaultError> for ProgramError {
        fn from(e: StakeVaultError) -> Self {
            ProgramError::Custom(e as u32)
        }
    }

    impl<T> DecodeError<T> for StakeVaultError {
        fn type_of() -> &'static str {
            "StakeVaultError"
        }
    }

    pub fn map_ledger_error(e: LedgerError) -> ProgramError {
        let err = match e {
            LedgerError::ZeroAmount => StakeVaultError::ZeroAmount,
            LedgerError::NothingToInitiate => StakeVaultError::NothingToInitiate,
            LedgerError::AmountExceedsStake => StakeVaultError::AmountExceedsStake,
            LedgerError::InsufficientReceipt => StakeVaultError::InsufficientReceipt,
            LedgerError::ExitQueueFull => StakeVaultError::ExitQueueFull,
            LedgerError::InvalidIndex => StakeVaultError::InvalidIndex,
            LedgerError::Locked => StakeVaultError::Locked,
            LedgerError::Unlocked => StakeVaultError::Unlocked,
            LedgerError::RewardsSinkNotSet => StakeVaultError::RewardsSinkNotSet,
            LedgerError::LedgerFull => StakeVaultError::LedgerFull,
            LedgerError::Overflow => StakeVaultError::Overflow,
        };
        err.into()
    }

    pub fn map_rewards_error(e: RewardsError) -> ProgramError {
        let err = match e {
            RewardsError::ZeroAmount => StakeVaultError::ZeroAmount,
            RewardsError::MinimumInitialDeposit => StakeVaultError::MinimumInitialDeposit,
            RewardsError::InsufficientBalance => StakeVaultError::InsufficientBalance,
            RewardsError::NoRewards => StakeVaultError::NoRewards,
            RewardsError::ExitPending => StakeVaultError::ExitPending,
            RewardsError::EpochNotReady => StakeVaultError::EpochNotReady,
            RewardsError::DepositorsFull => StakeVaultError::DepositorsFull,
            RewardsError::Overflow => StakeVaultError::Overflow,
        };
        err.into()
    }
}

// 4. mod ix
pub mod ix {
    use solana_program::{program_error::ProgramError, pubkey::Pubkey};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Instruction {
        InitLedger { lock_duration: u64, penalty_bps: u16 },
        Stake { amount: u64 },
        InitiateExit { amount: u64 },
        CancelExit { index: u8 },
        Exit { index: u8 },
        InstantExit { index: u8 },
        SetRewardsSink { sink: Pubkey },
        SetPaused { paused: bool },
        SetPauser { pauser: Pubkey },
        VerifyBacking,
        InitRewards {
            epoch_duration: u64,
            min_initial_deposit: u64,
            min_penalty_flush: u64,
            claim_gate: u8,
        },
        Deposit { amount: u64 },
        Withdraw { amount: u64 },
        Claim,
        NotifyReward { amount: u64 },
        AddPendingPenalty { amount: u64 },
        AdvanceEpoch,
        SetNotifier { notifier: Pubkey, enabled: bool },
        SetStakeLedger { ledger: Pubkey },
        QueryPendingRewards { owner: Pubkey },
        QueryExitQueueLength { owner: Pubkey },
    }

    impl Instruction {
        pub fn decode(input: &[u8]) -> Result<Self, ProgramError> {
            let (&tag, mut rest) = input
                .split_first()
                .ok_or(ProgramError::InvalidInstructionData)?;

            match tag {
                0 => {
                    let lock_duration = read_u64(&mut rest)?;
                    let penalty_bps = read_u16(&mut rest)?;
                    Ok(Instruction::InitLedger { lock_duration, penalty_bps })
                }
                1 => Ok(Instruction::Stake { amount: read_u64(&mut rest)? }),
                2 => Ok(Instruction::InitiateExit { amount: read_u64(&mut rest)? }),
                3 => Ok(Instruction::CancelExit { index: read_u8(&mut rest)? }),
                4 => Ok(Instruction::Exit { index: read_u8(&mut rest)? }),
                5 => Ok(Instruction::InstantExit { index: read_u8(&mut rest)? }),
                6 => Ok(Instruction::SetRewardsSink { sink: read_pubkey(&mut rest)? }),
                7 => Ok(Instruction::SetPaused { paused: read_bool(&mut rest)? }),
                8 => Ok(Instruction::SetPauser { pauser: read_pubkey(&mut rest)? }),
                9 => Ok(Instruction::VerifyBacking),
                10 => {
                    let epoch_duration = read_u64(&mut rest)?;
                    let min_initial_deposit = read_u64(&mut rest)?;
                    let min_penalty_flush = read_u64(&mut rest)?;
                    let claim_gate = read_u8(&mut rest)?;
                    Ok(Instruction::InitRewards {
                        epoch_duration,
                        min_initial_deposit,
                        min_penalty_flush,
                        claim_gate,
                    })
                }
                11 => Ok(Instruction::Deposit { amount: read_u64(&mut rest)? }),
                12 => Ok(Instruction::Withdraw { amount: read_u64(&mut rest)? }),
                13 => Ok(Instruction::Claim),
                14 => Ok(Instruction::NotifyReward { amount: read_u64(&mut rest)? }),
                15 => Ok(Instruction::AddPendingPenalty { amount: read_u64(&mut rest)? }),
                16 => Ok(Instruction::AdvanceEpoch),
                17 => {
                    let notifier = read_pubkey(&mut rest)?;
                    let enabled = read_bool(&mut rest)?;
                    Ok(Instruction::SetNotifier { notifier, enabled })
                }
                18 => Ok(Instruction::SetStakeLedger { ledger: read_pubkey(&mut rest)? }),
                19 => Ok(Instruction::QueryPendingRewards { owner: read_pubkey(&mut rest)? }),
                20 => Ok(Instruction::QueryExitQueueLength { owner: read_pubkey(&mut rest)? }),
                _ => Err(ProgramError::InvalidInstructionData),
            }
        }

        /// Wire encoding, the inverse of `decode`.
        pub fn pack(&self) -> Vec<u8> {
            let mut buf = Vec::with_capacity(34);
            match self {
                Instruction::InitLedger { lock_duration, penalty_bps } => {
                    buf.push(0);
                    buf.extend_from_slice(&lock_duration.to_le_bytes());
                    buf.extend_from_slice(&penalty_bps.to_le_bytes());
                }
                Instruction::Stake { amount } => push_u64(&mut buf, 1, *amount),
                Instruction::InitiateExit { amount } => push_u64(&mut buf, 2, *amount),
                Instruction::CancelExit { index } => buf.extend_from_slice(&[3, *index]),
                Instruction::Exit { index } => buf.extend_from_slice(&[4, *index]),
                Instruction::InstantExit { index } => buf.extend_from_slice(&[5, *index]),
                Instruction::SetRewardsSink { sink } => push_pubkey(&mut buf, 6, sink),
                Instruction::SetPaused { paused } => buf.extend_from_slice(&[7, *paused as u8]),
                Instruction::SetPauser { pauser } => push_pubkey(&mut buf, 8, pauser),
                Instruction::VerifyBacking => buf.push(9),
                Instruction::InitRewards {
                    epoch_duration,
                    min_initial_deposit,
                    min_penalty_flush,
                    claim_gate,
                } => {
                    buf.push(10);
                    buf.extend_from_slice(&epoch_duration.to_le_bytes());
                    buf.extend_from_slice(&min_initial_deposit.to_le_bytes());
                    buf.extend_from_slice(&min_penalty_flush.to_le_bytes());
                    buf.push(*claim_gate);
                }
                Instruction::Deposit { amount } => push_u64(&mut buf, 11, *amount),
                Instruction::Withdraw { amount } => push_u64(&mut buf, 12, *amount),
                Instruction::Claim => buf.push(13),
                Instruction::NotifyReward { amount } => push_u64(&mut buf, 14, *amount),
                Instruction::AddPendingPenalty { amount } => push_u64(&mut buf, 15, *amount),
                Instruction::AdvanceEpoch => buf.push(16),
                Instruction::SetNotifier { notifier, enabled } => {
                    push_pubkey(&mut buf, 17, notifier);
                    buf.push(*enabled as u8);
                }
                Instruction::SetStakeLedger { ledger } => push_pubkey(&mut buf, 18, ledger),
                Instruction::QueryPendingRewards { owner } => push_pubkey(&mut buf, 19, owner),
                Instruction::QueryExitQueueLength { owner } => push_pubkey(&mut buf, 20, owner),
            }
            buf
        }
    }

    fn push_u64(buf: &mut Vec<u8>, tag: u8, val: u64) {
        buf.push(tag);
        buf.extend_from_slice(&val.to_le_bytes());
    }

    fn push_pubkey(buf: &mut Vec<u8>, tag: u8, key: &Pubkey) {
        buf.push(tag);
        buf.extend_from_slice(key.as_ref());
    }

    fn take<const N: usize>(input: &mut &[u8]) -> Result<[u8; N], ProgramError> {
        if input.len() < N {
            return Err(ProgramError::InvalidInstructionData);
        }
        let (bytes, rest) = input.split_at(N);
        *input = rest;
        bytes
            .try_into()
            .map_err(|_| ProgramError::InvalidInstructionData)
    }

    fn read_u8(input: &mut &[u8]) -> Result<u8, ProgramError> {
        let (&val, rest) = input
            .split_first()
            .ok_or(ProgramError::InvalidInstructionData)?;
        *input = rest;
        Ok(val)
    }

    fn read_bool(input: &mut &[u8]) -> Result<bool, ProgramError> {
        match read_u8(input)? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(ProgramError::InvalidInstructionData),
        }
    }

    fn read_u16(input: &mut &[u8]) -> Result<u16, ProgramError> {
        Ok(u16::from_le_bytes(take::<2>(input)?))
    }

    fn read_u64(input: &mut &[u8]) -> Result<u64, ProgramError> {
        Ok(u64::from_le_bytes(take::<8>(input)?))
    }

    fn read_pubkey(input: &mut &[u8]) -> Result<Pubkey, ProgramError> {
        Ok(Pubkey::new_from_array(take::<32>(input)?))
    }
}

// 5. mod accounts (validation)
pub mod accounts {
    use crate::constants::{LEDGER_SEED, REWARDS_SEED};
    use crate::error::StakeVaultError;
    use solana_program::{account_info::AccountInfo, program_error::ProgramError, pubkey::Pubkey};

    pub fn expect_len(accounts: &[AccountInfo], n: usize) -> Result<(), ProgramError> {
        if accounts.len() < n {
            return Err(ProgramError::NotEnoughAccountKeys);
        }
        Ok(())
    }

    pub fn expect_signer(ai: &AccountInfo) -> Result<(), ProgramError> {
        if !ai.is_signer {
            return Err(StakeVaultError::ExpectedSigner.into());
        }
        Ok(())
    }

    pub fn expect_writable(ai: &AccountInfo) -> Result<(), ProgramError> {
        if !ai.is_writable {
            return Err(StakeVaultError::ExpectedWritable.into());
        }
        Ok(())
    }

    pub fn expect_owner(ai: &AccountInfo, owner: &Pubkey) -> Result<(), ProgramError> {
        if ai.owner != owner {
            return Err(ProgramError::IllegalOwner);
        }
        Ok(())
    }

    pub fn expect_key(ai: &AccountInfo, expected: &Pubkey) -> Result<(), ProgramError> {
        if ai.key != expected {
            return Err(ProgramError::InvalidArgument);
        }
        Ok(())
    }

    /// Ledger PDA: owns the base vault and receipt escrow, mints receipts.
    pub fn derive_ledger_authority(program_id: &Pubkey, slab_key: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[LEDGER_SEED, slab_key.as_ref()], program_id)
    }

    /// Rewards PDA: owns the deposit and reward vaults.
    pub fn derive_rewards_authority(program_id: &Pubkey, slab_key: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[REWARDS_SEED, slab_key.as_ref()], program_id)
    }
}

// 6. mod state
pub mod state {
    use crate::constants::{HEADER_LEN, LEDGER_CONFIG_LEN, MAX_NOTIFIERS, REWARDS_CONFIG_LEN};
    use crate::error::StakeVaultError;
    use bytemuck::{Pod, Zeroable};
    use core::cell::RefMut;
    use num_derive::FromPrimitive;
    use solana_program::account_info::AccountInfo;
    use solana_program::program_error::ProgramError;

    #[repr(u8)]
    #[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
    pub enum SlabKind {
        Ledger = 1,
        Rewards = 2,
    }

    #[repr(C)]
    #[derive(Clone, Copy, Debug, Pod, Zeroable)]
    pub struct SlabHeader {
        pub magic: u64,
        pub version: u32,
        pub kind: u8,
        pub bump: u8,
        pub paused: u8,
        pub _padding: u8,
        pub admin: [u8; 32],
        pub pauser: [u8; 32],
        pub _reserved: [u8; 16],
    }

    impl SlabHeader {
        pub fn is_paused(&self) -> bool {
            self.paused != 0
        }
    }

    #[repr(C)]
    #[derive(Clone, Copy, Debug, Pod, Zeroable)]
    pub struct LedgerConfig {
        pub base_mint: [u8; 32],
        pub receipt_mint: [u8; 32],
        pub base_vault: [u8; 32],
        pub receipt_escrow: [u8; 32],
        /// Rewards slab receiving instant-exit penalties; all zeros = unset
        pub rewards_sink: [u8; 32],
        pub authority_bump: u8,
        pub _padding: [u8; 7],
    }

    impl LedgerConfig {
        pub fn has_rewards_sink(&self) -> bool {
            self.rewards_sink != [0; 32]
        }
    }

    #[repr(C)]
    #[derive(Clone, Copy, Debug, Pod, Zeroable)]
    pub struct RewardsConfig {
        pub receipt_mint: [u8; 32],
        pub base_mint: [u8; 32],
        pub deposit_vault: [u8; 32],
        pub reward_vault: [u8; 32],
        /// Ledger slab allowed to route penalties and answer exit-queue queries
        pub stake_ledger: [u8; 32],
        pub notifiers: [[u8; 32]; MAX_NOTIFIERS],
        pub authority_bump: u8,
        pub _padding: [u8; 7],
    }

    impl RewardsConfig {
        pub fn has_stake_ledger(&self) -> bool {
            self.stake_ledger != [0; 32]
        }

        pub fn is_notifier(&self, key: &[u8; 32]) -> bool {
            *key != [0; 32] && self.notifiers.iter().any(|n| n == key)
        }

        pub fn set_notifier(&mut self, key: [u8; 32], enabled: bool) -> Result<(), StakeVaultError> {
            if enabled {
                if self.is_notifier(&key) {
                    return Ok(());
                }
                let slot = self
                    .notifiers
                    .iter_mut()
                    .find(|n| **n == [0; 32])
                    .ok_or(StakeVaultError::NotifierTableFull)?;
                *slot = key;
            } else {
                for n in self.notifiers.iter_mut().filter(|n| **n == key) {
                    *n = [0; 32];
                }
            }
            Ok(())
        }
    }

    pub fn slab_data_mut<'a, 'b>(
        ai: &'b AccountInfo<'a>,
    ) -> Result<RefMut<'b, &'a mut [u8]>, ProgramError> {
        Ok(ai.try_borrow_mut_data()?)
    }

    pub fn read_header(data: &[u8]) -> SlabHeader {
        let mut h = SlabHeader::zeroed();
        bytemuck::bytes_of_mut(&mut h).copy_from_slice(&data[..HEADER_LEN]);
        h
    }

    pub fn write_header(data: &mut [u8], h: &SlabHeader) {
        data[..HEADER_LEN].copy_from_slice(bytemuck::bytes_of(h));
    }

    pub fn read_ledger_config(data: &[u8]) -> LedgerConfig {
        let mut c = LedgerConfig::zeroed();
        bytemuck::bytes_of_mut(&mut c)
            .copy_from_slice(&data[HEADER_LEN..HEADER_LEN + LEDGER_CONFIG_LEN]);
        c
    }

    pub fn write_ledger_config(data: &mut [u8], c: &LedgerConfig) {
        data[HEADER_LEN..HEADER_LEN + LEDGER_CONFIG_LEN].copy_from_slice(bytemuck::bytes_of(c));
    }

    pub fn read_rewards_config(data: &[u8]) -> RewardsConfig {
        let mut c = RewardsConfig::zeroed();
        bytemuck::bytes_of_mut(&mut c)
            .copy_from_slice(&data[HEADER_LEN..HEADER_LEN + REWARDS_CONFIG_LEN]);
        c
    }

    pub fn write_rewards_config(data: &mut [u8], c: &RewardsConfig) {
        data[HEADER_LEN..HEADER_LEN + REWARDS_CONFIG_LEN].copy_from_slice(bytemuck::bytes_of(c));
    }
}

// 7. mod token (SPL CPIs; packed-state rewrites under cfg(test))
pub mod token {
    use crate::error::StakeVaultError;
    use solana_program::{
        account_info::AccountInfo, program_error::ProgramError, program_pack::Pack,
    };
    use spl_token::state::{Account as TokenAccount, Mint};

    #[cfg(not(test))]
    use solana_program::program::{invoke, invoke_signed};

    #[cfg(test)]
    use spl_token::error::TokenError;

    pub fn read_account(ai: &AccountInfo) -> Result<TokenAccount, ProgramError> {
        if ai.owner != &spl_token::ID || ai.data_len() != TokenAccount::LEN {
            return Err(StakeVaultError::InvalidTokenAccount.into());
        }
        let data = ai.try_borrow_data()?;
        TokenAccount::unpack(&data)
    }

    pub fn read_mint(ai: &AccountInfo) -> Result<Mint, ProgramError> {
        if ai.owner != &spl_token::ID || ai.data_len() != Mint::LEN {
            return Err(StakeVaultError::InvalidMint.into());
        }
        let data = ai.try_borrow_data()?;
        Mint::unpack(&data)
    }

    #[cfg(test)]
    fn move_amount(source: &AccountInfo, dest: &AccountInfo, amount: u64) -> Result<(), ProgramError> {
        let mut src_data = source.try_borrow_mut_data()?;
        let mut src_state = TokenAccount::unpack(&src_data)?;
        let mut dst_data = dest.try_borrow_mut_data()?;
        let mut dst_state = TokenAccount::unpack(&dst_data)?;
        if src_state.mint != dst_state.mint {
            return Err(TokenError::MintMismatch.into());
        }
        src_state.amount = src_state.amount.checked_sub(amount).ok_or(TokenError::InsufficientFunds)?;
        dst_state.amount = dst_state.amount.checked_add(amount).ok_or(TokenError::Overflow)?;
        TokenAccount::pack(src_state, &mut src_data)?;
        TokenAccount::pack(dst_state, &mut dst_data)?;
        Ok(())
    }

    /// Transfer signed by a wallet present in the transaction.
    pub fn transfer<'a>(
        _token_program: &AccountInfo<'a>,
        source: &AccountInfo<'a>,
        dest: &AccountInfo<'a>,
        _authority: &AccountInfo<'a>,
        amount: u64,
    ) -> Result<(), ProgramError> {
        #[cfg(not(test))]
        {
            let ix = spl_token::instruction::transfer(
                _token_program.key,
                source.key,
                dest.key,
                _authority.key,
                &[],
                amount,
            )?;
            invoke(&ix, &[source.clone(), dest.clone(), _authority.clone(), _token_program.clone()])
        }
        #[cfg(test)]
        {
            move_amount(source, dest, amount)
        }
    }

    /// Transfer out of a PDA-owned vault.
    pub fn transfer_signed<'a>(
        _token_program: &AccountInfo<'a>,
        source: &AccountInfo<'a>,
        dest: &AccountInfo<'a>,
        _authority: &AccountInfo<'a>,
        amount: u64,
        _signer_seeds: &[&[&[u8]]],
    ) -> Result<(), ProgramError> {
        #[cfg(not(test))]
        {
            let ix = spl_token::instruction::transfer(
                _token_program.key,
                source.key,
                dest.key,
                _authority.key,
                &[],
                amount,
            )?;
            invoke_signed(
                &ix,
                &[source.clone(), dest.clone(), _authority.clone(), _token_program.clone()],
                _signer_seeds,
            )
        }
        #[cfg(test)]
        {
            move_amount(source, dest, amount)
        }
    }

    pub fn mint_to_signed<'a>(
        _token_program: &AccountInfo<'a>,
        mint: &AccountInfo<'a>,
        dest: &AccountInfo<'a>,
        _authority: &AccountInfo<'a>,
        amount: u64,
        _signer_seeds: &[&[&[u8]]],
    ) -> Result<(), ProgramError> {
        #[cfg(not(test))]
        {
            let ix = spl_token::instruction::mint_to(
                _token_program.key,
                mint.key,
                dest.key,
                _authority.key,
                &[],
                amount,
            )?;
            invoke_signed(
                &ix,
                &[mint.clone(), dest.clone(), _authority.clone(), _token_program.clone()],
                _signer_seeds,
            )
        }
        #[cfg(test)]
        {
            let mut mint_data = mint.try_borrow_mut_data()?;
            let mut mint_state = Mint::unpack(&mint_data)?;
            let mut dst_data = dest.try_borrow_mut_data()?;
            let mut dst_state = TokenAccount::unpack(&dst_data)?;
            if dst_state.mint != *mint.key {
                return Err(TokenError::MintMismatch.into());
            }
            mint_state.supply = mint_state.supply.checked_add(amount).ok_or(TokenError::Overflow)?;
            dst_state.amount = dst_state.amount.checked_add(amount).ok_or(TokenError::Overflow)?;
            Mint::pack(mint_state, &mut mint_data)?;
            TokenAccount::pack(dst_state, &mut dst_data)?;
            Ok(())
        }
    }

    pub fn burn_signed<'a>(
        _token_program: &AccountInfo<'a>,
        source: &AccountInfo<'a>,
        mint: &AccountInfo<'a>,
        _authority: &AccountInfo<'a>,
        amount: u64,
        _signer_seeds: &[&[&[u8]]],
    ) -> Result<(), ProgramError> {
        #[cfg(not(test))]
        {
            let ix = spl_token::instruction::burn(
                _token_program.key,
                source.key,
                mint.key,
                _authority.key,
                &[],
                amount,
            )?;
            invoke_signed(
                &ix,
                &[source.clone(), mint.clone(), _authority.clone(), _token_program.clone()],
                _signer_seeds,
            )
        }
        #[cfg(test)]
        {
            let mut src_data = source.try_borrow_mut_data()?;
            let mut src_state = TokenAccount::unpack(&src_data)?;
            let mut mint_data = mint.try_borrow_mut_data()?;
            let mut mint_state = Mint::unpack(&mint_data)?;
            if src_state.mint != *mint.key {
                return Err(TokenError::MintMismatch.into());
            }
            src_state.amount = src_state.amount.checked_sub(amount).ok_or(TokenError::InsufficientFunds)?;
            mint_state.supply = mint_state.supply.checked_sub(amount).ok_or(TokenError::Overflow)?;
            TokenAccount::pack(src_state, &mut src_data)?;
            Mint::pack(mint_state, &mut mint_data)?;
            Ok(())
        }
    }
}

// 8. mod events (structured program logs)
pub mod events {
    use solana_program::{msg, pubkey::Pubkey};

    pub fn staked(owner: &Pubkey, amount: u64, principal: u64, total_backing: u64) {
        msg!("event=staked owner={} amount={} principal={} total_backing={}", owner, amount, principal, total_backing);
    }

    pub fn exit_initiated(owner: &Pubkey, index: usize, amount: u64, initiated_at: i64) {
        msg!("event=exit_initiated owner={} index={} amount={} initiated_at={}", owner, index, amount, initiated_at);
    }

    pub fn exit_cancelled(owner: &Pubkey, index: u8, amount: u64) {
        msg!("event=exit_cancelled owner={} index={} amount={}", owner, index, amount);
    }

    pub fn exited(owner: &Pubkey, index: u8, amount: u64) {
        msg!("event=exited owner={} index={} amount={}", owner, index, amount);
    }

    pub fn instant_exited(owner: &Pubkey, index: u8, amount: u64, penalty: u64, payout: u64) {
        msg!(
            "event=instant_exited owner={} index={} amount={} penalty={} payout={}",
            owner, index, amount, penalty, payout
        );
    }

    pub fn deposited(owner: &Pubkey, amount: u64, total_deposits: u64) {
        msg!("event=deposited owner={} amount={} total_deposits={}", owner, amount, total_deposits);
    }

    pub fn withdrawn(owner: &Pubkey, amount: u64, total_deposits: u64) {
        msg!("event=withdrawn owner={} amount={} total_deposits={}", owner, amount, total_deposits);
    }

    pub fn claimed(owner: &Pubkey, amount: u64) {
        msg!("event=claimed owner={} amount={}", owner, amount);
    }

    pub fn reward_notified(notifier: &Pubkey, amount: u64, acc_increase: u128, pending_rewards: u64) {
        let mode = if acc_increase == 0 { "buffered" } else { "distributed" };
        msg!(
            "event=reward_notified notifier={} amount={} mode={} pending_rewards={}",
            notifier, amount, mode, pending_rewards
        );
    }

    pub fn penalty_buffered(source: &Pubkey, amount: u64, pending_penalties: u64) {
        msg!("event=penalty_buffered source={} amount={} pending_penalties={}", source, amount, pending_penalties);
    }

    pub fn epoch_advanced(epoch: u64, epoch_clock: i64) {
        msg!("event=epoch_advanced epoch={} epoch_clock={}", epoch, epoch_clock);
    }

    pub fn paused(slab: &Pubkey, paused: bool) {
        msg!("event=paused slab={} paused={}", slab, paused);
    }

    pub fn config_changed(slab: &Pubkey, field: &str, value: &Pubkey) {
        msg!("event=config_changed slab={} field={} value={}", slab, field, value);
    }
}

// 9. mod verify (pure authorization predicates, proven under Kani)
pub mod verify {
    /// An all-zero admin key never authorizes anything.
    #[inline]
    pub fn admin_ok(admin: [u8; 32], signer: [u8; 32]) -> bool {
        admin != [0; 32] && admin == signer
    }

    #[inline]
    pub fn pause_authorized(admin: [u8; 32], pauser: [u8; 32], signer: [u8; 32]) -> bool {
        admin_ok(admin, signer) || (pauser != [0; 32] && pauser == signer)
    }

    /// A penalty may only be routed into the configured sink, and only when
    /// that rewards slab names this ledger as its stake ledger.
    #[inline]
    pub fn penalty_route_ok(
        configured_sink: [u8; 32],
        passed_sink: [u8; 32],
        sink_stake_ledger: [u8; 32],
        ledger: [u8; 32],
    ) -> bool {
        configured_sink != [0; 32] && configured_sink == passed_sink && sink_stake_ledger == ledger
    }
}

// 10. mod processor
pub mod processor {
    use crate::{
        accounts,
        constants::{LEDGER_SEED, LEDGER_SLAB_LEN, MAGIC, REWARDS_SEED, REWARDS_SLAB_LEN, VERSION},
        error::{map_ledger_error, map_rewards_error, StakeVaultError},
        events,
        ix::Instruction,
        verify,
        ledger::{LedgerParams, BPS_DENOMINATOR},
        rewards::{ClaimGate, RewardsParams},
        state::{self, LedgerConfig, RewardsConfig, SlabHeader, SlabKind},
        token, zc,
    };
    use num_traits::FromPrimitive;
    use solana_program::{
        account_info::AccountInfo,
        entrypoint::ProgramResult,
        program::set_return_data,
        program_error::ProgramError,
        program_option::COption,
        pubkey::Pubkey,
        sysvar::{clock::Clock, Sysvar},
    };

    fn slab_len(kind: SlabKind) -> usize {
        match kind {
            SlabKind::Ledger => LEDGER_SLAB_LEN,
            SlabKind::Rewards => REWARDS_SLAB_LEN,
        }
    }

    fn slab_guard(program_id: &Pubkey, slab: &AccountInfo, data: &[u8], kind: SlabKind) -> Result<(), ProgramError> {
        accounts::expect_owner(slab, program_id)?;
        if data.len() != slab_len(kind) {
            return Err(StakeVaultError::InvalidSlabLen.into());
        }
        Ok(())
    }

    /// Validates an initialized slab of the given kind and returns its header.
    fn require_slab(program_id: &Pubkey, slab: &AccountInfo, data: &[u8], kind: SlabKind) -> Result<SlabHeader, ProgramError> {
        slab_guard(program_id, slab, data, kind)?;
        let h = state::read_header(data);
        if h.magic != MAGIC {
            return Err(StakeVaultError::NotInitialized.into());
        }
        if h.version != VERSION {
            return Err(StakeVaultError::InvalidVersion.into());
        }
        if h.kind != kind as u8 {
            return Err(StakeVaultError::InvalidSlabKind.into());
        }
        Ok(h)
    }

    /// Reads the header of an initialized slab of either kind.
    fn require_any_slab(program_id: &Pubkey, slab: &AccountInfo, data: &[u8]) -> Result<(SlabHeader, SlabKind), ProgramError> {
        accounts::expect_owner(slab, program_id)?;
        if data.len() < crate::constants::HEADER_LEN {
            return Err(StakeVaultError::InvalidSlabLen.into());
        }
        let h = state::read_header(data);
        if h.magic != MAGIC {
            return Err(StakeVaultError::NotInitialized.into());
        }
        let kind = SlabKind::from_u8(h.kind).ok_or(StakeVaultError::InvalidSlabKind)?;
        require_slab(program_id, slab, data, kind)?;
        Ok((h, kind))
    }

    fn require_live(h: &SlabHeader) -> Result<(), ProgramError> {
        if h.is_paused() {
            return Err(StakeVaultError::Paused.into());
        }
        Ok(())
    }

    fn require_admin(h: &SlabHeader, signer: &AccountInfo) -> Result<(), ProgramError> {
        accounts::expect_signer(signer)?;
        if !verify::admin_ok(h.admin, signer.key.to_bytes()) {
            return Err(StakeVaultError::Unauthorized.into());
        }
        Ok(())
    }

    fn verify_vault(a_vault: &AccountInfo, expected_owner: &Pubkey, expected_mint: &Pubkey) -> Result<(), ProgramError> {
        let tok = token::read_account(a_vault).map_err(|_| StakeVaultError::InvalidVault)?;
        if tok.mint != *expected_mint {
            return Err(StakeVaultError::InvalidMint.into());
        }
        if tok.owner != *expected_owner || tok.amount != 0 {
            return Err(StakeVaultError::InvalidVault.into());
        }
        Ok(())
    }

    fn clock_now(a_clock: &AccountInfo) -> Result<i64, ProgramError> {
        Ok(Clock::from_account_info(a_clock)?.unix_timestamp)
    }

    fn expect_token_program(ai: &AccountInfo) -> Result<(), ProgramError> {
        accounts::expect_key(ai, &spl_token::ID)
    }

    pub fn process_instruction<'a, 'b>(
        program_id: &Pubkey,
        accounts: &'b [AccountInfo<'a>],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = Instruction::decode(instruction_data)?;

        match instruction {
            Instruction::InitLedger { lock_duration, penalty_bps } => {
                accounts::expect_len(accounts, 6)?;
                let a_admin = &accounts[0];
                let a_slab = &accounts[1];
                let a_base_mint = &accounts[2];
                let a_receipt_mint = &accounts[3];
                let a_base_vault = &accounts[4];
                let a_escrow = &accounts[5];

                accounts::expect_signer(a_admin)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                slab_guard(program_id, a_slab, &data, SlabKind::Ledger)?;
                if state::read_header(&data).magic == MAGIC {
                    return Err(StakeVaultError::AlreadyInitialized.into());
                }

                if penalty_bps as u64 > BPS_DENOMINATOR {
                    return Err(StakeVaultError::InvalidBasisPoints.into());
                }
                if lock_duration == 0 || lock_duration > i64::MAX as u64 {
                    return Err(StakeVaultError::InvalidDuration.into());
                }

                let (auth, bump) = accounts::derive_ledger_authority(program_id, a_slab.key);

                token::read_mint(a_base_mint)?;
                let receipt = token::read_mint(a_receipt_mint)?;
                if a_base_mint.key == a_receipt_mint.key
                    || receipt.mint_authority != COption::Some(auth)
                    || receipt.supply != 0
                {
                    return Err(StakeVaultError::InvalidMint.into());
                }
                verify_vault(a_base_vault, &auth, a_base_mint.key)?;
                verify_vault(a_escrow, &auth, a_receipt_mint.key)?;

                data.fill(0);
                let engine = zc::ledger_mut(&mut data)?;
                engine.init_in_place(LedgerParams {
                    lock_duration,
                    instant_exit_penalty_bps: penalty_bps as u64,
                });

                let config = LedgerConfig {
                    base_mint: a_base_mint.key.to_bytes(),
                    receipt_mint: a_receipt_mint.key.to_bytes(),
                    base_vault: a_base_vault.key.to_bytes(),
                    receipt_escrow: a_escrow.key.to_bytes(),
                    rewards_sink: [0; 32],
                    authority_bump: bump,
                    _padding: [0; 7],
                };
                state::write_ledger_config(&mut data, &config);

                let header = SlabHeader {
                    magic: MAGIC,
                    version: VERSION,
                    kind: SlabKind::Ledger as u8,
                    bump,
                    paused: 0,
                    _padding: 0,
                    admin: a_admin.key.to_bytes(),
                    pauser: a_admin.key.to_bytes(),
                    _reserved: [0; 16],
                };
                state::write_header(&mut data, &header);
                events::config_changed(a_slab.key, "admin", a_admin.key);
            }
            Instruction::Stake { amount } => {
                accounts::expect_len(accounts, 8)?;
                let a_user = &accounts[0];
                let a_slab = &accounts[1];
                let a_user_base = &accounts[2];
                let a_base_vault = &accounts[3];
                let a_user_receipt = &accounts[4];
                let a_receipt_mint = &accounts[5];
                let a_pda = &accounts[6];
                let a_token = &accounts[7];

                accounts::expect_signer(a_user)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                let header = require_slab(program_id, a_slab, &data, SlabKind::Ledger)?;
                require_live(&header)?;
                let config = state::read_ledger_config(&data);

                accounts::expect_key(a_base_vault, &Pubkey::new_from_array(config.base_vault))?;
                accounts::expect_key(a_receipt_mint, &Pubkey::new_from_array(config.receipt_mint))?;
                let (auth, _) = accounts::derive_ledger_authority(program_id, a_slab.key);
                accounts::expect_key(a_pda, &auth)?;
                expect_token_program(a_token)?;

                let engine = zc::ledger_mut(&mut data)?;
                let owner = a_user.key.to_bytes();
                let principal = engine.stake(&owner, amount).map_err(map_ledger_error)?;
                let total_backing = engine.total_backing;

                let bump_arr = [config.authority_bump];
                let seeds: [&[u8]; 3] = [LEDGER_SEED, a_slab.key.as_ref(), &bump_arr];
                let signer_seeds: [&[&[u8]]; 1] = [&seeds];

                token::transfer(a_token, a_user_base, a_base_vault, a_user, amount)?;
                token::mint_to_signed(a_token, a_receipt_mint, a_user_receipt, a_pda, amount, &signer_seeds)?;
                events::staked(a_user.key, amount, principal, total_backing);
            }
            Instruction::InitiateExit { amount } => {
                accounts::expect_len(accounts, 6)?;
                let a_user = &accounts[0];
                let a_slab = &accounts[1];
                let a_user_receipt = &accounts[2];
                let a_escrow = &accounts[3];
                let a_token = &accounts[4];
                let a_clock = &accounts[5];

                accounts::expect_signer(a_user)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                let header = require_slab(program_id, a_slab, &data, SlabKind::Ledger)?;
                require_live(&header)?;
                let config = state::read_ledger_config(&data);

                accounts::expect_key(a_escrow, &Pubkey::new_from_array(config.receipt_escrow))?;
                expect_token_program(a_token)?;

                let receipt = token::read_account(a_user_receipt)?;
                if receipt.mint.to_bytes() != config.receipt_mint || receipt.owner != *a_user.key {
                    return Err(StakeVaultError::InvalidTokenAccount.into());
                }

                let now = clock_now(a_clock)?;
                let engine = zc::ledger_mut(&mut data)?;
                let index = engine
                    .initiate_exit(&a_user.key.to_bytes(), amount, receipt.amount, now)
                    .map_err(map_ledger_error)?;

                token::transfer(a_token, a_user_receipt, a_escrow, a_user, amount)?;
                events::exit_initiated(a_user.key, index, amount, now);
            }
            Instruction::CancelExit { index } => {
                accounts::expect_len(accounts, 6)?;
                let a_user = &accounts[0];
                let a_slab = &accounts[1];
                let a_escrow = &accounts[2];
                let a_user_receipt = &accounts[3];
                let a_pda = &accounts[4];
                let a_token = &accounts[5];

                accounts::expect_signer(a_user)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                let header = require_slab(program_id, a_slab, &data, SlabKind::Ledger)?;
                require_live(&header)?;
                let config = state::read_ledger_config(&data);

                accounts::expect_key(a_escrow, &Pubkey::new_from_array(config.receipt_escrow))?;
                let (auth, _) = accounts::derive_ledger_authority(program_id, a_slab.key);
                accounts::expect_key(a_pda, &auth)?;
                expect_token_program(a_token)?;

                let engine = zc::ledger_mut(&mut data)?;
                let request = engine
                    .cancel_exit(&a_user.key.to_bytes(), index as usize)
                    .map_err(map_ledger_error)?;

                let bump_arr = [config.authority_bump];
                let seeds: [&[u8]; 3] = [LEDGER_SEED, a_slab.key.as_ref(), &bump_arr];
                let signer_seeds: [&[&[u8]]; 1] = [&seeds];

                token::transfer_signed(a_token, a_escrow, a_user_receipt, a_pda, request.amount, &signer_seeds)?;
                events::exit_cancelled(a_user.key, index, request.amount);
            }
            Instruction::Exit { index } => {
                accounts::expect_len(accounts, 9)?;
                let a_user = &accounts[0];
                let a_slab = &accounts[1];
                let a_escrow = &accounts[2];
                let a_receipt_mint = &accounts[3];
                let a_base_vault = &accounts[4];
                let a_user_base = &accounts[5];
                let a_pda = &accounts[6];
                let a_token = &accounts[7];
                let a_clock = &accounts[8];

                accounts::expect_signer(a_user)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                let header = require_slab(program_id, a_slab, &data, SlabKind::Ledger)?;
                require_live(&header)?;
                let config = state::read_ledger_config(&data);

                accounts::expect_key(a_escrow, &Pubkey::new_from_array(config.receipt_escrow))?;
                accounts::expect_key(a_receipt_mint, &Pubkey::new_from_array(config.receipt_mint))?;
                accounts::expect_key(a_base_vault, &Pubkey::new_from_array(config.base_vault))?;
                let (auth, _) = accounts::derive_ledger_authority(program_id, a_slab.key);
                accounts::expect_key(a_pda, &auth)?;
                expect_token_program(a_token)?;

                let now = clock_now(a_clock)?;
                let engine = zc::ledger_mut(&mut data)?;
                let request = engine
                    .exit(&a_user.key.to_bytes(), index as usize, now)
                    .map_err(map_ledger_error)?;

                let bump_arr = [config.authority_bump];
                let seeds: [&[u8]; 3] = [LEDGER_SEED, a_slab.key.as_ref(), &bump_arr];
                let signer_seeds: [&[&[u8]]; 1] = [&seeds];

                token::burn_signed(a_token, a_escrow, a_receipt_mint, a_pda, request.amount, &signer_seeds)?;
                token::transfer_signed(a_token, a_base_vault, a_user_base, a_pda, request.amount, &signer_seeds)?;
                events::exited(a_user.key, index, request.amount);
            }
            Instruction::InstantExit { index } => {
                accounts::expect_len(accounts, 9)?;
                let a_user = &accounts[0];
                let a_slab = &accounts[1];
                let a_escrow = &accounts[2];
                let a_receipt_mint = &accounts[3];
                let a_base_vault = &accounts[4];
                let a_user_base = &accounts[5];
                let a_pda = &accounts[6];
                let a_token = &accounts[7];
                let a_clock = &accounts[8];

                accounts::expect_signer(a_user)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                let header = require_slab(program_id, a_slab, &data, SlabKind::Ledger)?;
                require_live(&header)?;
                let config = state::read_ledger_config(&data);

                accounts::expect_key(a_escrow, &Pubkey::new_from_array(config.receipt_escrow))?;
                accounts::expect_key(a_receipt_mint, &Pubkey::new_from_array(config.receipt_mint))?;
                accounts::expect_key(a_base_vault, &Pubkey::new_from_array(config.base_vault))?;
                let (auth, _) = accounts::derive_ledger_authority(program_id, a_slab.key);
                accounts::expect_key(a_pda, &auth)?;
                expect_token_program(a_token)?;

                let now = clock_now(a_clock)?;
                let owner = a_user.key.to_bytes();
                let quote = zc::ledger_ref(&data)?
                    .quote_instant_exit(&owner, index as usize, now)
                    .map_err(map_ledger_error)?;

                // Sink accounts are only required (and validated) when a penalty is due.
                let mut sink = None;
                if quote.penalty > 0 && config.has_rewards_sink() {
                    accounts::expect_len(accounts, 11)?;
                    let a_rewards = &accounts[9];
                    let a_reward_vault = &accounts[10];
                    accounts::expect_writable(a_rewards)?;
                    if config.rewards_sink != a_rewards.key.to_bytes() {
                        return Err(StakeVaultError::InvalidRewardsSink.into());
                    }

                    let rewards_data = state::slab_data_mut(a_rewards)?;
                    require_slab(program_id, a_rewards, &rewards_data, SlabKind::Rewards)?;
                    let rewards_config = state::read_rewards_config(&rewards_data);
                    let routed = verify::penalty_route_ok(
                        config.rewards_sink,
                        a_rewards.key.to_bytes(),
                        rewards_config.stake_ledger,
                        a_slab.key.to_bytes(),
                    );
                    if !routed || rewards_config.reward_vault != a_reward_vault.key.to_bytes() {
                        return Err(StakeVaultError::InvalidRewardsSink.into());
                    }
                    sink = Some((a_rewards, a_reward_vault, rewards_data));
                }

                let engine = zc::ledger_mut(&mut data)?;
                let outcome = engine
                    .instant_exit(&owner, index as usize, now, sink.is_some())
                    .map_err(map_ledger_error)?;

                let mut pending_penalties = 0;
                if let Some((_, _, rewards_data)) = sink.as_mut() {
                    if outcome.penalty > 0 {
                        let rewards = zc::rewards_mut(rewards_data)?;
                        pending_penalties = rewards
                            .add_pending_penalty(outcome.penalty, now)
                            .map_err(map_rewards_error)?;
                    }
                }

                let bump_arr = [config.authority_bump];
                let seeds: [&[u8]; 3] = [LEDGER_SEED, a_slab.key.as_ref(), &bump_arr];
                let signer_seeds: [&[&[u8]]; 1] = [&seeds];

                token::burn_signed(a_token, a_escrow, a_receipt_mint, a_pda, outcome.request.amount, &signer_seeds)?;
                if let Some((a_rewards, a_reward_vault, _)) = sink.as_ref() {
                    if outcome.penalty > 0 {
                        token::transfer_signed(a_token, a_base_vault, a_reward_vault, a_pda, outcome.penalty, &signer_seeds)?;
                        events::penalty_buffered(a_rewards.key, outcome.penalty, pending_penalties);
                    }
                }
                if outcome.payout > 0 {
                    token::transfer_signed(a_token, a_base_vault, a_user_base, a_pda, outcome.payout, &signer_seeds)?;
                }
                events::instant_exited(a_user.key, index, outcome.request.amount, outcome.penalty, outcome.payout);
            }
            Instruction::SetRewardsSink { sink } => {
                accounts::expect_len(accounts, 2)?;
                let a_admin = &accounts[0];
                let a_slab = &accounts[1];
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                let header = require_slab(program_id, a_slab, &data, SlabKind::Ledger)?;
                require_admin(&header, a_admin)?;

                if sink != Pubkey::default() {
                    accounts::expect_len(accounts, 3)?;
                    let a_rewards = &accounts[2];
                    accounts::expect_key(a_rewards, &sink)
                        .map_err(|_| StakeVaultError::InvalidRewardsSink)?;
                    let rewards_data = a_rewards.try_borrow_data()?;
                    require_slab(program_id, a_rewards, &rewards_data, SlabKind::Rewards)?;
                    if state::read_rewards_config(&rewards_data).stake_ledger != a_slab.key.to_bytes() {
                        return Err(StakeVaultError::InvalidRewardsSink.into());
                    }
                }

                let mut config = state::read_ledger_config(&data);
                config.rewards_sink = sink.to_bytes();
                state::write_ledger_config(&mut data, &config);
                events::config_changed(a_slab.key, "rewards_sink", &sink);
            }
            Instruction::SetPaused { paused } => {
                accounts::expect_len(accounts, 2)?;
                let a_signer = &accounts[0];
                let a_slab = &accounts[1];
                accounts::expect_signer(a_signer)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                let (mut header, _) = require_any_slab(program_id, a_slab, &data)?;
                if !verify::pause_authorized(header.admin, header.pauser, a_signer.key.to_bytes()) {
                    return Err(StakeVaultError::Unauthorized.into());
                }
                header.paused = paused as u8;
                state::write_header(&mut data, &header);
                events::paused(a_slab.key, paused);
            }
            Instruction::SetPauser { pauser } => {
                accounts::expect_len(accounts, 2)?;
                let a_admin = &accounts[0];
                let a_slab = &accounts[1];
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                let (mut header, _) = require_any_slab(program_id, a_slab, &data)?;
                require_admin(&header, a_admin)?;
                header.pauser = pauser.to_bytes();
                state::write_header(&mut data, &header);
                events::config_changed(a_slab.key, "pauser", &pauser);
            }
            Instruction::VerifyBacking => {
                accounts::expect_len(accounts, 3)?;
                let a_slab = &accounts[0];
                let a_base_vault = &accounts[1];
                let a_receipt_mint = &accounts[2];

                let data = a_slab.try_borrow_data()?;
                require_slab(program_id, a_slab, &data, SlabKind::Ledger)?;
                let config = state::read_ledger_config(&data);
                accounts::expect_key(a_base_vault, &Pubkey::new_from_array(config.base_vault))?;
                accounts::expect_key(a_receipt_mint, &Pubkey::new_from_array(config.receipt_mint))?;

                let total_backing = zc::ledger_ref(&data)?.total_backing;
                let held = token::read_account(a_base_vault)?.amount;
                let supply = token::read_mint(a_receipt_mint)?.supply;
                if held != total_backing || supply != total_backing {
                    solana_program::msg!(
                        "event=backing_mismatch total_backing={} vault={} receipt_supply={}",
                        total_backing, held, supply
                    );
                    return Err(StakeVaultError::BackingMismatch.into());
                }
            }
            Instruction::InitRewards {
                epoch_duration,
                min_initial_deposit,
                min_penalty_flush,
                claim_gate,
            } => {
                accounts::expect_len(accounts, 7)?;
                let a_admin = &accounts[0];
                let a_slab = &accounts[1];
                let a_receipt_mint = &accounts[2];
                let a_base_mint = &accounts[3];
                let a_deposit_vault = &accounts[4];
                let a_reward_vault = &accounts[5];
                let a_clock = &accounts[6];

                accounts::expect_signer(a_admin)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                slab_guard(program_id, a_slab, &data, SlabKind::Rewards)?;
                if state::read_header(&data).magic == MAGIC {
                    return Err(StakeVaultError::AlreadyInitialized.into());
                }

                if epoch_duration == 0 || epoch_duration > i64::MAX as u64 {
                    return Err(StakeVaultError::InvalidDuration.into());
                }
                if min_initial_deposit == 0 || min_penalty_flush == 0 {
                    return Err(StakeVaultError::ZeroAmount.into());
                }
                let gate = ClaimGate::from_u8(claim_gate).ok_or(ProgramError::InvalidInstructionData)?;

                let (auth, bump) = accounts::derive_rewards_authority(program_id, a_slab.key);
                token::read_mint(a_receipt_mint)?;
                token::read_mint(a_base_mint)?;
                if a_receipt_mint.key == a_base_mint.key {
                    return Err(StakeVaultError::InvalidMint.into());
                }
                verify_vault(a_deposit_vault, &auth, a_receipt_mint.key)?;
                verify_vault(a_reward_vault, &auth, a_base_mint.key)?;

                let now = clock_now(a_clock)?;

                data.fill(0);
                let engine = zc::rewards_mut(&mut data)?;
                engine.init_in_place(
                    RewardsParams {
                        epoch_duration,
                        min_initial_deposit,
                        min_penalty_flush,
                        claim_gate: gate as u64,
                    },
                    now,
                );

                let config = RewardsConfig {
                    receipt_mint: a_receipt_mint.key.to_bytes(),
                    base_mint: a_base_mint.key.to_bytes(),
                    deposit_vault: a_deposit_vault.key.to_bytes(),
                    reward_vault: a_reward_vault.key.to_bytes(),
                    stake_ledger: [0; 32],
                    notifiers: [[0; 32]; crate::constants::MAX_NOTIFIERS],
                    authority_bump: bump,
                    _padding: [0; 7],
                };
                state::write_rewards_config(&mut data, &config);

                let header = SlabHeader {
                    magic: MAGIC,
                    version: VERSION,
                    kind: SlabKind::Rewards as u8,
                    bump,
                    paused: 0,
                    _padding: 0,
                    admin: a_admin.key.to_bytes(),
                    pauser: a_admin.key.to_bytes(),
                    _reserved: [0; 16],
                };
                state::write_header(&mut data, &header);
                events::config_changed(a_slab.key, "admin", a_admin.key);
            }
            Instruction::Deposit { amount } => {
                accounts::expect_len(accounts, 6)?;
                let a_user = &accounts[0];
                let a_slab = &accounts[1];
                let a_user_receipt = &accounts[2];
                let a_deposit_vault = &accounts[3];
                let a_token = &accounts[4];
                let a_clock = &accounts[5];

                accounts::expect_signer(a_user)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                let header = require_slab(program_id, a_slab, &data, SlabKind::Rewards)?;
                require_live(&header)?;
                let config = state::read_rewards_config(&data);
                accounts::expect_key(a_deposit_vault, &Pubkey::new_from_array(config.deposit_vault))?;
                expect_token_program(a_token)?;

                let now = clock_now(a_clock)?;
                let engine = zc::rewards_mut(&mut data)?;
                engine
                    .deposit(&a_user.key.to_bytes(), amount, now)
                    .map_err(map_rewards_error)?;
                let total_deposits = engine.total_deposits;

                token::transfer(a_token, a_user_receipt, a_deposit_vault, a_user, amount)?;
                events::deposited(a_user.key, amount, total_deposits);
            }
            Instruction::Withdraw { amount } => {
                accounts::expect_len(accounts, 7)?;
                let a_user = &accounts[0];
                let a_slab = &accounts[1];
                let a_deposit_vault = &accounts[2];
                let a_user_receipt = &accounts[3];
                let a_pda = &accounts[4];
                let a_token = &accounts[5];
                let a_clock = &accounts[6];

                accounts::expect_signer(a_user)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                let header = require_slab(program_id, a_slab, &data, SlabKind::Rewards)?;
                require_live(&header)?;
                let config = state::read_rewards_config(&data);
                accounts::expect_key(a_deposit_vault, &Pubkey::new_from_array(config.deposit_vault))?;
                let (auth, _) = accounts::derive_rewards_authority(program_id, a_slab.key);
                accounts::expect_key(a_pda, &auth)?;
                expect_token_program(a_token)?;

                let now = clock_now(a_clock)?;
                let engine = zc::rewards_mut(&mut data)?;
                engine
                    .withdraw(&a_user.key.to_bytes(), amount, now)
                    .map_err(map_rewards_error)?;
                let total_deposits = engine.total_deposits;

                let bump_arr = [config.authority_bump];
                let seeds: [&[u8]; 3] = [REWARDS_SEED, a_slab.key.as_ref(), &bump_arr];
                let signer_seeds: [&[&[u8]]; 1] = [&seeds];

                token::transfer_signed(a_token, a_deposit_vault, a_user_receipt, a_pda, amount, &signer_seeds)?;
                events::withdrawn(a_user.key, amount, total_deposits);
            }
            Instruction::Claim => {
                accounts::expect_len(accounts, 7)?;
                let a_user = &accounts[0];
                let a_slab = &accounts[1];
                let a_reward_vault = &accounts[2];
                let a_user_base = &accounts[3];
                let a_pda = &accounts[4];
                let a_token = &accounts[5];
                let a_clock = &accounts[6];

                accounts::expect_signer(a_user)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                let header = require_slab(program_id, a_slab, &data, SlabKind::Rewards)?;
                require_live(&header)?;
                let config = state::read_rewards_config(&data);
                accounts::expect_key(a_reward_vault, &Pubkey::new_from_array(config.reward_vault))?;
                let (auth, _) = accounts::derive_rewards_authority(program_id, a_slab.key);
                accounts::expect_key(a_pda, &auth)?;
                expect_token_program(a_token)?;

                let now = clock_now(a_clock)?;
                let owner = a_user.key.to_bytes();

                let exit_queue_len = match zc::rewards_ref(&data)?.params.claim_gate() {
                    ClaimGate::Open => 0,
                    ClaimGate::ExitQueueEmpty => {
                        accounts::expect_len(accounts, 8)?;
                        let a_ledger = &accounts[7];
                        if !config.has_stake_ledger() || a_ledger.key.to_bytes() != config.stake_ledger {
                            return Err(StakeVaultError::InvalidStakeLedger.into());
                        }
                        let ledger_data = a_ledger.try_borrow_data()?;
                        require_slab(program_id, a_ledger, &ledger_data, SlabKind::Ledger)?;
                        zc::ledger_ref(&ledger_data)?.exit_queue_len(&owner)
                    }
                };

                let engine = zc::rewards_mut(&mut data)?;
                let payout = engine
                    .claim(&owner, now, exit_queue_len)
                    .map_err(map_rewards_error)?;

                let bump_arr = [config.authority_bump];
                let seeds: [&[u8]; 3] = [REWARDS_SEED, a_slab.key.as_ref(), &bump_arr];
                let signer_seeds: [&[&[u8]]; 1] = [&seeds];

                token::transfer_signed(a_token, a_reward_vault, a_user_base, a_pda, payout, &signer_seeds)?;
                events::claimed(a_user.key, payout);
            }
            Instruction::NotifyReward { amount } | Instruction::AddPendingPenalty { amount } => {
                accounts::expect_len(accounts, 6)?;
                let a_notifier = &accounts[0];
                let a_slab = &accounts[1];
                let a_source = &accounts[2];
                let a_reward_vault = &accounts[3];
                let a_token = &accounts[4];
                let a_clock = &accounts[5];

                accounts::expect_signer(a_notifier)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                let header = require_slab(program_id, a_slab, &data, SlabKind::Rewards)?;
                require_live(&header)?;
                let config = state::read_rewards_config(&data);
                if !config.is_notifier(&a_notifier.key.to_bytes()) {
                    return Err(StakeVaultError::Unauthorized.into());
                }
                accounts::expect_key(a_reward_vault, &Pubkey::new_from_array(config.reward_vault))?;
                expect_token_program(a_token)?;

                let now = clock_now(a_clock)?;
                let engine = zc::rewards_mut(&mut data)?;
                let is_penalty = matches!(instruction, Instruction::AddPendingPenalty { .. });
                if is_penalty {
                    let pending = engine
                        .add_pending_penalty(amount, now)
                        .map_err(map_rewards_error)?;
                    token::transfer(a_token, a_source, a_reward_vault, a_notifier, amount)?;
                    events::penalty_buffered(a_notifier.key, amount, pending);
                } else {
                    let outcome = engine.notify_reward(amount, now).map_err(map_rewards_error)?;
                    token::transfer(a_token, a_source, a_reward_vault, a_notifier, amount)?;
                    events::reward_notified(a_notifier.key, amount, outcome.acc_increase, outcome.pending_rewards);
                }
            }
            Instruction::AdvanceEpoch => {
                accounts::expect_len(accounts, 3)?;
                let a_caller = &accounts[0];
                let a_slab = &accounts[1];
                let a_clock = &accounts[2];

                accounts::expect_signer(a_caller)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                let header = require_slab(program_id, a_slab, &data, SlabKind::Rewards)?;
                require_live(&header)?;

                let now = clock_now(a_clock)?;
                let engine = zc::rewards_mut(&mut data)?;
                let epoch = engine.advance_epoch(now).map_err(map_rewards_error)?;
                events::epoch_advanced(epoch, engine.epoch_clock);
            }
            Instruction::SetNotifier { notifier, enabled } => {
                accounts::expect_len(accounts, 2)?;
                let a_admin = &accounts[0];
                let a_slab = &accounts[1];
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                let header = require_slab(program_id, a_slab, &data, SlabKind::Rewards)?;
                require_admin(&header, a_admin)?;
                if notifier == Pubkey::default() {
                    return Err(ProgramError::InvalidArgument);
                }

                let mut config = state::read_rewards_config(&data);
                config.set_notifier(notifier.to_bytes(), enabled)?;
                state::write_rewards_config(&mut data, &config);
                let field = if enabled { "notifier_added" } else { "notifier_removed" };
                events::config_changed(a_slab.key, field, &notifier);
            }
            Instruction::SetStakeLedger { ledger } => {
                accounts::expect_len(accounts, 3)?;
                let a_admin = &accounts[0];
                let a_slab = &accounts[1];
                let a_ledger = &accounts[2];
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                let header = require_slab(program_id, a_slab, &data, SlabKind::Rewards)?;
                require_admin(&header, a_admin)?;

                let mut config = state::read_rewards_config(&data);
                if config.has_stake_ledger() {
                    return Err(StakeVaultError::StakeLedgerAlreadySet.into());
                }
                accounts::expect_key(a_ledger, &ledger)
                    .map_err(|_| StakeVaultError::InvalidStakeLedger)?;
                {
                    let ledger_data = a_ledger.try_borrow_data()?;
                    require_slab(program_id, a_ledger, &ledger_data, SlabKind::Ledger)
                        .map_err(|_| StakeVaultError::InvalidStakeLedger)?;
                    let ledger_config = state::read_ledger_config(&ledger_data);
                    if ledger_config.receipt_mint != config.receipt_mint
                        || ledger_config.base_mint != config.base_mint
                    {
                        return Err(StakeVaultError::InvalidStakeLedger.into());
                    }
                }

                config.stake_ledger = ledger.to_bytes();
                state::write_rewards_config(&mut data, &config);
                events::config_changed(a_slab.key, "stake_ledger", &ledger);
            }
            Instruction::QueryPendingRewards { owner } => {
                accounts::expect_len(accounts, 2)?;
                let a_slab = &accounts[0];
                let a_clock = &accounts[1];

                let data = a_slab.try_borrow_data()?;
                require_slab(program_id, a_slab, &data, SlabKind::Rewards)?;
                let now = clock_now(a_clock)?;
                let pending = zc::rewards_ref(&data)?
                    .pending_rewards_of(&owner.to_bytes(), now)
                    .map_err(map_rewards_error)?;
                set_return_data(&pending.to_le_bytes());
            }
            Instruction::QueryExitQueueLength { owner } => {
                accounts::expect_len(accounts, 1)?;
                let a_slab = &accounts[0];

                let data = a_slab.try_borrow_data()?;
                require_slab(program_id, a_slab, &data, SlabKind::Ledger)?;
                let len = zc::ledger_ref(&data)?.exit_queue_len(&owner.to_bytes());
                set_return_data(&[len as u8]);
            }
        }
        Ok(())
    }
}

// 11. mod entrypoint
#[cfg(not(feature = "no-entrypoint"))]
pub mod entrypoint {
    use crate::processor;
    use solana_program::{
        account_info::AccountInfo, entrypoint, entrypoint::ProgramResult, pubkey::Pubkey,
    };

    entrypoint!(process_instruction);

    fn process_instruction<'a>(
        program_id: &Pubkey,
        accounts: &'a [AccountInfo<'a>],
        instruction_data: &[u8],
    ) -> ProgramResult {
        processor::process_instruction(program_id, accounts, instruction_data)
    }
}
