use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use stakevault_prog::ledger::{LedgerEngine, LedgerParams};
use stakevault_prog::rewards::{ClaimGate, RewardsEngine, RewardsParams};

const LOCK: u64 = 50;

fn ledger_params() -> LedgerParams {
    LedgerParams {
        lock_duration: LOCK,
        instant_exit_penalty_bps: 300,
    }
}

fn rewards_params() -> RewardsParams {
    RewardsParams {
        epoch_duration: 200,
        min_initial_deposit: 100,
        min_penalty_flush: 5_000,
        claim_gate: ClaimGate::ExitQueueEmpty as u64,
    }
}

/// Wallet-side view of one participant, mirroring what token accounts would hold.
#[derive(Default, Clone, Copy)]
struct Wallet {
    base: u64,
    receipt: u64,
}

#[test]
fn deterministic_fuzz_simulation() {
    let seed = [0x5au8; 16];
    let mut rng = XorShiftRng::from_seed(seed);
    let mut ledger = Box::new(LedgerEngine::new(ledger_params()));
    let mut rewards = Box::new(RewardsEngine::new(rewards_params(), 0));

    let owners: Vec<[u8; 32]> = (1..=6u8).map(|i| [i; 32]).collect();
    let mut wallets = vec![Wallet { base: 1_000_000, receipt: 0 }; owners.len()];
    let mut base_vault = 0u64;
    let mut reward_vault = 0u64;
    let mut paid_out = 0u64;

    for i in 0..2_000 {
        let now = (i / 4) as i64;
        let w = rng.gen_range(0..owners.len());
        let owner = &owners[w];
        let op: u8 = rng.gen_range(0..8);

        match op {
            0 => {
                // Stake
                let amt = rng.gen_range(1..20_000u64).min(wallets[w].base);
                if ledger.stake(owner, amt).is_ok() {
                    wallets[w].base -= amt;
                    wallets[w].receipt += amt;
                    base_vault += amt;
                }
            }
            1 => {
                // Initiate exit
                let amt = rng.gen_range(1..10_000u64);
                if ledger
                    .initiate_exit(owner, amt, wallets[w].receipt, now)
                    .is_ok()
                {
                    wallets[w].receipt -= amt;
                }
            }
            2 => {
                // Cancel exit
                let len = ledger.exit_queue_len(owner);
                if len > 0 {
                    let idx = rng.gen_range(0..len);
                    let req = ledger.cancel_exit(owner, idx).unwrap();
                    wallets[w].receipt += req.amount;
                }
            }
            3 => {
                // Exit or instant exit, whichever the lock allows
                let len = ledger.exit_queue_len(owner);
                if len > 0 {
                    let idx = rng.gen_range(0..len);
                    if let Ok(req) = ledger.exit(owner, idx, now) {
                        wallets[w].base += req.amount;
                        base_vault -= req.amount;
                    } else {
                        let out = ledger.instant_exit(owner, idx, now, true).unwrap();
                        wallets[w].base += out.payout;
                        base_vault -= out.request.amount;
                        if out.penalty > 0 {
                            rewards.add_pending_penalty(out.penalty, now).unwrap();
                            reward_vault += out.penalty;
                        }
                    }
                }
            }
            4 => {
                // Deposit receipts
                let amt = rng.gen_range(1..5_000u64).min(wallets[w].receipt);
                if rewards.deposit(owner, amt, now).is_ok() {
                    wallets[w].receipt -= amt;
                }
            }
            5 => {
                // Withdraw receipts
                let amt = rng.gen_range(1..5_000u64);
                if rewards.withdraw(owner, amt, now).is_ok() {
                    wallets[w].receipt += amt;
                }
            }
            6 => {
                // Claim
                let queued = ledger.exit_queue_len(owner);
                if let Ok(paid) = rewards.claim(owner, now, queued) {
                    assert_eq!(queued, 0, "claim passed the exit-queue gate at step {}", i);
                    wallets[w].base += paid;
                    reward_vault -= paid;
                    paid_out += paid;
                }
            }
            7 => {
                // External revenue
                let amt = rng.gen_range(1..3_000u64);
                rewards.notify_reward(amt, now).unwrap();
                reward_vault += amt;
            }
            _ => {}
        }

        assert!(ledger.check_conservation(), "Ledger conservation violated at step {}", i);
        assert!(rewards.check_conservation(), "Rewards conservation violated at step {}", i);
        assert_eq!(ledger.total_backing, base_vault, "Backing drift at step {}", i);

        let receipts: u64 = wallets.iter().map(|w| w.receipt).sum::<u64>()
            + owners
                .iter()
                .map(|o| ledger.exit_queue(o).iter().map(|r| r.amount).sum::<u64>())
                .sum::<u64>()
            + rewards.total_deposits;
        assert_eq!(receipts, ledger.total_backing, "Receipt supply drift at step {}", i);
        assert_eq!(rewards.total_claimed, paid_out);
    }
}
