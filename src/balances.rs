/// Recovers the running balance for each transaction from the amounts alone,
/// anchored on the single balance value a statement file discloses.
///
/// `amounts[0]` must be the *most recent* transaction (statement exports list
/// newest first) and `final_balance` the account balance immediately after it.
/// The result has the same order: `balances[0] == final_balance` and, walking
/// backwards through time, `balances[i] == balances[i + 1] + amounts[i]`.
/// Feeding oldest-first data silently produces wrong balances; the ordering is
/// part of the contract.
pub fn reconstruct_balances(amounts: &[f64], final_balance: f64) -> Vec<f64> {
    if amounts.is_empty() {
        return Vec::new();
    }

    // Cumulative sum oldest-first, flipped back to newest-first, then shifted
    // so the newest entry lands exactly on the anchor.
    let mut accumulated: Vec<f64> = Vec::with_capacity(amounts.len());
    let mut sum = 0.0;
    for amount in amounts.iter().rev() {
        sum += amount;
        accumulated.push(sum);
    }
    accumulated.reverse();

    let newest = accumulated[0];
    accumulated
        .iter()
        .map(|c| c - newest + final_balance)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(expected: f64, actual: f64) {
        assert!(
            (expected - actual).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_all_close(expected: &[f64], actual: &[f64]) {
        assert_eq!(expected.len(), actual.len());
        for (e, a) in expected.iter().zip(actual) {
            assert_close(*e, *a);
        }
    }

    #[test]
    fn test_empty_input_gives_empty_output() {
        assert!(reconstruct_balances(&[], 100.0).is_empty());
    }

    #[test]
    fn test_single_amount_returns_anchor() {
        assert_eq!(reconstruct_balances(&[-937.12], 42.5), vec![42.5]);
    }

    #[test]
    fn test_unit_amounts() {
        let balances = reconstruct_balances(&[1.0, 1.0, 1.0, 1.0], 4.0);
        assert_all_close(&[4.0, 3.0, 2.0, 1.0], &balances);
    }

    #[test]
    fn test_mixed_amounts_newest_first() {
        let amounts = [-12.23, 9.00, 453.23, -232.32];
        let balances = reconstruct_balances(&amounts, 221.32);
        assert_all_close(&[221.32, 233.55, 224.55, -228.68], &balances);
    }

    #[test]
    fn test_oldest_first_reading_of_the_same_amounts() {
        // The same four amounts read as oldest-first, i.e. reversed before the
        // call; reversing the result back gives the oldest-first balance
        // history ending on the anchor.
        let amounts = [-232.32, 453.23, 9.00, -12.23];
        let mut balances = reconstruct_balances(&amounts, 221.32);
        balances.reverse();
        assert_all_close(&[-8.59, 0.41, 453.64, 221.32], &balances);
    }

    #[test]
    fn test_dkb_cash_sample_balances() {
        let balances = reconstruct_balances(&[-12.16, 120.0, -10.0], 1248.54);
        assert_all_close(&[1248.54, 1260.70, 1140.70], &balances);
    }

    #[test]
    fn test_adjacent_balances_satisfy_the_recurrence() {
        let amounts = [
            -460.0, 12.34, -99.99, 2500.0, -0.01, 731.5, -18.2, -250.0, 4.75, -1200.0,
        ];
        let final_balance = 3817.66;
        let balances = reconstruct_balances(&amounts, final_balance);

        assert_close(final_balance, balances[0]);
        for i in 0..amounts.len() - 1 {
            assert_close(balances[i], balances[i + 1] + amounts[i]);
        }
    }
}
