//! Transaction validator
//!
//! Pure, side-effect-free checks of a proposed movement against the
//! account snapshots passed in. The validator never re-reads storage:
//! the optimistic-concurrency retry loop in the engine depends on the
//! decision being a function of the snapshots alone.

use crate::types::{Account, AccountStatus, RejectReason};

/// Validate a proposed movement against account snapshots
///
/// `debit` is the account money leaves (absent for deposits), `credit`
/// the account money enters (absent for withdrawals). Returns `Ok(())`
/// when the movement may be applied against exactly these snapshots,
/// or the specific rejection otherwise.
pub fn validate(
    debit: Option<&Account>,
    credit: Option<&Account>,
    amount_minor: i64,
) -> Result<(), RejectReason> {
    if amount_minor <= 0 {
        return Err(RejectReason::InvalidAmount);
    }

    for account in [debit, credit].into_iter().flatten() {
        match account.status {
            AccountStatus::Active => {}
            AccountStatus::Frozen => return Err(RejectReason::AccountFrozen),
            AccountStatus::Closed => return Err(RejectReason::AccountClosed),
        }
    }

    if let Some(debit) = debit {
        // Overdraft is forbidden: the debited balance must cover the
        // full amount.
        if debit.balance_minor < amount_minor {
            return Err(RejectReason::InsufficientFunds);
        }
    }

    if let Some(credit) = credit {
        // The credited balance must stay within i64 minor units; an
        // unchecked add would wrap on commit.
        if credit.balance_minor.checked_add(amount_minor).is_none() {
            return Err(RejectReason::BalanceOverflow);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AccountId;

    fn account(balance: i64, status: AccountStatus) -> Account {
        Account {
            id: AccountId::new("ES-001"),
            balance_minor: balance,
            status,
            version: 1,
        }
    }

    #[test]
    fn test_valid_transfer() {
        let a = account(1000, AccountStatus::Active);
        let b = account(500, AccountStatus::Active);
        assert_eq!(validate(Some(&a), Some(&b), 300), Ok(()));
    }

    #[test]
    fn test_insufficient_funds() {
        let a = account(100, AccountStatus::Active);
        assert_eq!(
            validate(Some(&a), None, 150),
            Err(RejectReason::InsufficientFunds)
        );
    }

    #[test]
    fn test_exact_balance_allowed() {
        let a = account(100, AccountStatus::Active);
        assert_eq!(validate(Some(&a), None, 100), Ok(()));
    }

    #[test]
    fn test_invalid_amount() {
        let a = account(1000, AccountStatus::Active);
        assert_eq!(validate(Some(&a), None, 0), Err(RejectReason::InvalidAmount));
        assert_eq!(
            validate(Some(&a), None, -50),
            Err(RejectReason::InvalidAmount)
        );
    }

    #[test]
    fn test_frozen_account_rejected_either_side() {
        let active = account(1000, AccountStatus::Active);
        let frozen = account(1000, AccountStatus::Frozen);
        assert_eq!(
            validate(Some(&frozen), Some(&active), 100),
            Err(RejectReason::AccountFrozen)
        );
        assert_eq!(
            validate(Some(&active), Some(&frozen), 100),
            Err(RejectReason::AccountFrozen)
        );
    }

    #[test]
    fn test_closed_account_rejected() {
        let closed = account(1000, AccountStatus::Closed);
        assert_eq!(
            validate(None, Some(&closed), 100),
            Err(RejectReason::AccountClosed)
        );
    }

    #[test]
    fn test_deposit_ignores_funds_check() {
        let empty = account(0, AccountStatus::Active);
        assert_eq!(validate(None, Some(&empty), 1), Ok(()));
    }

    #[test]
    fn test_credit_overflow_rejected() {
        let near_max = account(i64::MAX - 10, AccountStatus::Active);
        assert_eq!(
            validate(None, Some(&near_max), 100),
            Err(RejectReason::BalanceOverflow)
        );
        // Filling up to exactly i64::MAX is still representable.
        assert_eq!(validate(None, Some(&near_max), 10), Ok(()));
    }
}
