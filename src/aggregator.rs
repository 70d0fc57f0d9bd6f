// 📊 Aggregation Engine - Totals, groupings and rankings over a transaction list
//
// Every operation is a pure function of the slice it receives: nothing is
// cached between calls and the caller's data is never reordered.
//
// Name matching is deliberately asymmetric:
//   - sender lookups (sent-by totals, compliance check, top sender) ignore case
//   - beneficiary grouping and unique-client counting are exact

use crate::errors::{AggregationError, AggregationResult};
use crate::model::{fold_case, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Size of the default amount ranking
pub const DEFAULT_TOP_N: usize = 3;

// ============================================================================
// TOP SENDER RESULT
// ============================================================================

/// Winner of the sent-amount ranking, with its total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopSender {
    /// Spelling of the sender's first transaction
    pub name: String,

    /// Sum of every amount the sender sent
    pub total: f64,
}

// ============================================================================
// AGGREGATION ENGINE
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionAggregator;

impl TransactionAggregator {
    pub fn new() -> Self {
        TransactionAggregator
    }

    /// Sum of all transaction amounts
    pub fn total_amount(&self, transactions: &[Transaction]) -> AggregationResult<f64> {
        ensure_not_empty(transactions)?;

        let total: f64 = transactions.iter().map(|tx| tx.amount).sum();
        debug!(total, "total transaction amount");
        Ok(total)
    }

    /// Sum of amounts sent by `sender` (case-insensitive). Unknown senders sum to 0.
    pub fn total_amount_sent_by(
        &self,
        sender: &str,
        transactions: &[Transaction],
    ) -> AggregationResult<f64> {
        ensure_not_empty(transactions)?;

        let total: f64 = transactions
            .iter()
            .filter(|tx| tx.is_sent_by(sender))
            .map(|tx| tx.amount)
            .sum();
        debug!(sender, total, "total amount sent");
        Ok(total)
    }

    /// Highest single transaction amount
    pub fn max_amount(&self, transactions: &[Transaction]) -> AggregationResult<f64> {
        let max = transactions
            .iter()
            .map(|tx| tx.amount)
            .max_by(f64::total_cmp)
            .ok_or(AggregationError::EmptyInput)?;
        debug!(max, "maximum transaction amount");
        Ok(max)
    }

    /// Distinct names across senders and beneficiaries (exact match)
    pub fn count_unique_clients(&self, transactions: &[Transaction]) -> AggregationResult<usize> {
        ensure_not_empty(transactions)?;

        let clients: HashSet<&str> = transactions
            .iter()
            .flat_map(|tx| [tx.sender_full_name.as_str(), tx.beneficiary_full_name.as_str()])
            .collect();
        debug!(count = clients.len(), "unique clients");
        Ok(clients.len())
    }

    /// Transactions involving `client` (sender or beneficiary, case-insensitive)
    /// whose compliance issue is still open, in input order
    pub fn open_compliance_issues<'a>(
        &self,
        client: &str,
        transactions: &'a [Transaction],
    ) -> AggregationResult<Vec<&'a Transaction>> {
        ensure_not_empty(transactions)?;

        let open: Vec<&Transaction> = transactions
            .iter()
            .filter(|tx| tx.involves(client) && tx.has_open_issue())
            .collect();
        debug!(client, open = open.len(), "open compliance issues");
        Ok(open)
    }

    /// True when `client` has NO unsolved compliance issue.
    ///
    /// A client without any transaction is also clear.
    pub fn has_no_open_compliance_issues(
        &self,
        client: &str,
        transactions: &[Transaction],
    ) -> AggregationResult<bool> {
        Ok(self.open_compliance_issues(client, transactions)?.is_empty())
    }

    /// All transactions keyed by beneficiary name, input order kept per group.
    ///
    /// Single pass: each transaction is appended to its beneficiary's list, so
    /// scattered occurrences of the same beneficiary all land in one group.
    pub fn transactions_by_beneficiary<'a>(
        &self,
        transactions: &'a [Transaction],
    ) -> AggregationResult<BTreeMap<&'a str, Vec<&'a Transaction>>> {
        ensure_not_empty(transactions)?;

        let mut groups: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
        for tx in transactions {
            groups
                .entry(tx.beneficiary_full_name.as_str())
                .or_default()
                .push(tx);
        }

        debug!(beneficiaries = groups.len(), "grouped by beneficiary");
        Ok(groups)
    }

    /// Transfer numbers of every transaction with an unsolved issue
    pub fn unsolved_issue_ids(&self, transactions: &[Transaction]) -> AggregationResult<BTreeSet<i64>> {
        ensure_not_empty(transactions)?;

        let ids: BTreeSet<i64> = transactions
            .iter()
            .filter(|tx| tx.has_open_issue())
            .map(|tx| tx.mtn)
            .collect();
        debug!(count = ids.len(), "unsolved issue ids");
        Ok(ids)
    }

    /// Messages of solved issues in input order; solved issues without a message are skipped
    pub fn solved_issue_messages<'a>(
        &self,
        transactions: &'a [Transaction],
    ) -> AggregationResult<Vec<&'a str>> {
        ensure_not_empty(transactions)?;

        let messages: Vec<&str> = transactions
            .iter()
            .filter(|tx| tx.has_solved_issue())
            .filter_map(|tx| tx.issue_message.as_deref())
            .collect();
        debug!(count = messages.len(), "solved issue messages");
        Ok(messages)
    }

    /// The `n` largest transactions by amount, descending.
    ///
    /// Equal amounts keep their input order. Fails when fewer than `n`
    /// transactions exist rather than returning a short ranking.
    pub fn top_transactions_by_amount<'a>(
        &self,
        n: usize,
        transactions: &'a [Transaction],
    ) -> AggregationResult<Vec<&'a Transaction>> {
        ensure_not_empty(transactions)?;
        if transactions.len() < n {
            return Err(AggregationError::InsufficientData {
                required: n,
                available: transactions.len(),
            });
        }

        let mut ranked: Vec<&Transaction> = transactions.iter().collect();
        ranked.sort_by(|a, b| b.amount.total_cmp(&a.amount));
        ranked.truncate(n);

        debug!(
            amounts = ?ranked.iter().map(|tx| tx.amount).collect::<Vec<_>>(),
            "top transactions by amount"
        );
        Ok(ranked)
    }

    /// The three largest transactions by amount, descending
    pub fn top3_transactions_by_amount<'a>(
        &self,
        transactions: &'a [Transaction],
    ) -> AggregationResult<Vec<&'a Transaction>> {
        self.top_transactions_by_amount(DEFAULT_TOP_N, transactions)
    }

    /// Sender with the largest total sent amount.
    ///
    /// Senders are summed case-insensitively. On equal totals the sender seen
    /// first in the input wins.
    pub fn top_sender(&self, transactions: &[Transaction]) -> AggregationResult<TopSender> {
        ensure_not_empty(transactions)?;

        // First-seen order is kept in `totals`; `positions` only indexes into it
        let mut totals: Vec<(&str, f64)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for tx in transactions {
            match positions.entry(fold_case(&tx.sender_full_name)) {
                Entry::Occupied(slot) => totals[*slot.get()].1 += tx.amount,
                Entry::Vacant(slot) => {
                    slot.insert(totals.len());
                    totals.push((tx.sender_full_name.as_str(), tx.amount));
                }
            }
        }

        let (name, total) = totals
            .into_iter()
            .reduce(|best, candidate| if candidate.1 > best.1 { candidate } else { best })
            .ok_or(AggregationError::EmptyInput)?;

        debug!(name, total, "top sender");
        Ok(TopSender {
            name: name.to_string(),
            total,
        })
    }
}

fn ensure_not_empty(transactions: &[Transaction]) -> AggregationResult<()> {
    if transactions.is_empty() {
        return Err(AggregationError::EmptyInput);
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;

    fn create_test_transaction(mtn: i64, sender: &str, beneficiary: &str, amount: f64) -> Transaction {
        Transaction::new(mtn, amount, sender, beneficiary)
    }

    /// The three-transaction example: A→X 10, B→X 20, A→Y 5
    fn sample_transactions() -> Vec<Transaction> {
        vec![
            create_test_transaction(1, "A", "X", 10.0),
            create_test_transaction(2, "B", "X", 20.0),
            create_test_transaction(3, "A", "Y", 5.0),
        ]
    }

    /// Small name pool so generated data repeats parties
    const NAMES: [&str; 5] = ["Tom Shelby", "tom shelby", "Arthur Shelby", "Ada Shelby", "Alfie Solomons"];

    fn generated_transactions(raw: &[(u8, u8, u16)]) -> Vec<Transaction> {
        raw.iter()
            .enumerate()
            .map(|(i, &(s, b, amount))| {
                create_test_transaction(
                    i as i64,
                    NAMES[s as usize % NAMES.len()],
                    NAMES[b as usize % NAMES.len()],
                    f64::from(amount) / 4.0,
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_input_rejected_everywhere() {
        let engine = TransactionAggregator::new();
        let empty: Vec<Transaction> = vec![];

        assert_eq!(engine.total_amount(&empty), Err(AggregationError::EmptyInput));
        assert_eq!(
            engine.total_amount_sent_by("A", &empty),
            Err(AggregationError::EmptyInput)
        );
        assert_eq!(engine.max_amount(&empty), Err(AggregationError::EmptyInput));
        assert_eq!(engine.count_unique_clients(&empty), Err(AggregationError::EmptyInput));
        assert_eq!(
            engine.has_no_open_compliance_issues("A", &empty),
            Err(AggregationError::EmptyInput)
        );
        assert_eq!(
            engine.open_compliance_issues("A", &empty).unwrap_err(),
            AggregationError::EmptyInput
        );
        assert_eq!(
            engine.transactions_by_beneficiary(&empty).unwrap_err(),
            AggregationError::EmptyInput
        );
        assert_eq!(engine.unsolved_issue_ids(&empty), Err(AggregationError::EmptyInput));
        assert_eq!(
            engine.solved_issue_messages(&empty).unwrap_err(),
            AggregationError::EmptyInput
        );
        assert_eq!(
            engine.top3_transactions_by_amount(&empty).unwrap_err(),
            AggregationError::EmptyInput
        );
        assert_eq!(engine.top_sender(&empty), Err(AggregationError::EmptyInput));
    }

    #[test]
    fn test_sample_dataset() {
        let engine = TransactionAggregator::new();
        let transactions = sample_transactions();

        assert_eq!(engine.total_amount(&transactions).unwrap(), 35.0);
        assert_eq!(engine.count_unique_clients(&transactions).unwrap(), 4);

        let groups = engine.transactions_by_beneficiary(&transactions).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["X"], vec![&transactions[0], &transactions[1]]);
        assert_eq!(groups["Y"], vec![&transactions[2]]);

        let top = engine.top_sender(&transactions).unwrap();
        assert_eq!(
            top,
            TopSender {
                name: "B".to_string(),
                total: 20.0
            }
        );
    }

    #[test]
    fn test_total_amount_sent_by_ignores_case() {
        let engine = TransactionAggregator::new();
        let transactions = vec![
            create_test_transaction(1, "Tom Shelby", "Alfie Solomons", 100.0),
            create_test_transaction(2, "TOM SHELBY", "Ada Shelby", 50.5),
            create_test_transaction(3, "Arthur Shelby", "Tom Shelby", 999.0),
        ];

        assert_eq!(engine.total_amount_sent_by("tom shelby", &transactions).unwrap(), 150.5);
        assert_eq!(engine.total_amount_sent_by("Nobody", &transactions).unwrap(), 0.0);
    }

    #[test]
    fn test_max_amount() {
        let engine = TransactionAggregator::new();
        let transactions = vec![
            create_test_transaction(1, "A", "B", 12.5),
            create_test_transaction(2, "A", "B", 985.0),
            create_test_transaction(3, "A", "B", 985.0),
            create_test_transaction(4, "A", "B", 0.0),
        ];

        assert_eq!(engine.max_amount(&transactions).unwrap(), 985.0);
    }

    #[test]
    fn test_unique_clients_is_case_sensitive_and_unions_roles() {
        let engine = TransactionAggregator::new();
        let transactions = vec![
            create_test_transaction(1, "Tom Shelby", "Alfie Solomons", 1.0),
            create_test_transaction(2, "tom shelby", "Tom Shelby", 1.0),
            create_test_transaction(3, "Alfie Solomons", "Tom Shelby", 1.0),
        ];

        // "Tom Shelby", "tom shelby", "Alfie Solomons"
        assert_eq!(engine.count_unique_clients(&transactions).unwrap(), 3);
    }

    #[test]
    fn test_compliance_check_is_true_when_nothing_is_open() {
        let engine = TransactionAggregator::new();
        let transactions = vec![
            create_test_transaction(1, "Tom Shelby", "Alfie Solomons", 10.0)
                .with_issue(1, false, Some("Looks like money laundering")),
            create_test_transaction(2, "Arthur Shelby", "Ada Shelby", 10.0)
                .with_issue(2, true, Some("Never gonna give you up")),
            create_test_transaction(3, "Grace Burgess", "Michael Gray", 10.0),
        ];

        // Open issue as beneficiary, matched ignoring case
        assert!(!engine
            .has_no_open_compliance_issues("alfie solomons", &transactions)
            .unwrap());
        assert!(!engine
            .has_no_open_compliance_issues("Tom Shelby", &transactions)
            .unwrap());

        // Solved issue only
        assert!(engine
            .has_no_open_compliance_issues("Ada Shelby", &transactions)
            .unwrap());

        // No issue at all, and an unknown client
        assert!(engine
            .has_no_open_compliance_issues("Michael Gray", &transactions)
            .unwrap());
        assert!(engine
            .has_no_open_compliance_issues("John Shelby", &transactions)
            .unwrap());
    }

    #[test]
    fn test_open_compliance_issues_lists_offending_transactions() {
        let engine = TransactionAggregator::new();
        let transactions = vec![
            create_test_transaction(1, "Tom Shelby", "Alfie Solomons", 10.0).with_issue(1, false, None),
            create_test_transaction(2, "Alfie Solomons", "Tom Shelby", 10.0).with_issue(2, true, None),
            create_test_transaction(3, "Ada Shelby", "Alfie Solomons", 10.0).with_issue(3, false, None),
        ];

        let open = engine.open_compliance_issues("Alfie Solomons", &transactions).unwrap();
        assert_eq!(open.iter().map(|tx| tx.mtn).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_grouping_keeps_scattered_occurrences() {
        let engine = TransactionAggregator::new();
        // X appears before and after Y and Z; a forward-scan grouping would drop entries
        let transactions = vec![
            create_test_transaction(1, "A", "Y", 1.0),
            create_test_transaction(2, "A", "X", 2.0),
            create_test_transaction(3, "B", "Z", 3.0),
            create_test_transaction(4, "B", "Y", 4.0),
            create_test_transaction(5, "C", "X", 5.0),
            create_test_transaction(6, "C", "x", 6.0),
        ];

        let groups = engine.transactions_by_beneficiary(&transactions).unwrap();

        let mtns = |key: &str| groups[key].iter().map(|tx| tx.mtn).collect::<Vec<_>>();
        assert_eq!(groups.keys().copied().collect::<Vec<_>>(), vec!["X", "Y", "Z", "x"]);
        assert_eq!(mtns("X"), vec![2, 5]);
        assert_eq!(mtns("Y"), vec![1, 4]);
        assert_eq!(mtns("Z"), vec![3]);
        assert_eq!(mtns("x"), vec![6]);
    }

    #[test]
    fn test_unsolved_issue_ids_and_solved_messages() {
        let engine = TransactionAggregator::new();
        let transactions = vec![
            create_test_transaction(663458, "A", "B", 1.0).with_issue(1, false, Some("Looks like money laundering")),
            create_test_transaction(1284564, "A", "B", 1.0).with_issue(2, true, Some("Never gonna give you up")),
            create_test_transaction(96132456, "A", "B", 1.0).with_issue(3, true, None),
            create_test_transaction(5465465, "A", "B", 1.0).with_issue(4, false, None),
            create_test_transaction(32612651, "A", "B", 1.0).with_issue(5, true, Some("Never gonna let you down")),
            create_test_transaction(36448252, "A", "B", 1.0),
        ];

        let ids = engine.unsolved_issue_ids(&transactions).unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![663458, 5465465]);

        let messages = engine.solved_issue_messages(&transactions).unwrap();
        assert_eq!(
            messages,
            vec!["Never gonna give you up", "Never gonna let you down"]
        );
    }

    #[test]
    fn test_top3_sorted_descending_without_touching_input() {
        let engine = TransactionAggregator::new();
        let transactions = vec![
            create_test_transaction(1, "A", "B", 10.0),
            create_test_transaction(2, "A", "B", 985.0),
            create_test_transaction(3, "A", "B", 150.0),
            create_test_transaction(4, "A", "B", 985.0),
            create_test_transaction(5, "A", "B", 666.0),
        ];
        let before = transactions.clone();

        let top = engine.top3_transactions_by_amount(&transactions).unwrap();

        // Ties keep input order
        assert_eq!(top.iter().map(|tx| tx.mtn).collect::<Vec<_>>(), vec![2, 4, 5]);
        assert_eq!(transactions, before);
    }

    #[test]
    fn test_top3_with_fewer_than_three_transactions() {
        let engine = TransactionAggregator::new();
        let transactions = vec![
            create_test_transaction(1, "A", "B", 10.0),
            create_test_transaction(2, "A", "B", 20.0),
        ];

        assert_eq!(
            engine.top3_transactions_by_amount(&transactions).unwrap_err(),
            AggregationError::InsufficientData {
                required: 3,
                available: 2
            }
        );
        assert_eq!(engine.top_transactions_by_amount(2, &transactions).unwrap().len(), 2);
        assert!(engine.top_transactions_by_amount(0, &transactions).unwrap().is_empty());
    }

    #[test]
    fn test_top_sender_tie_goes_to_first_seen() {
        let engine = TransactionAggregator::new();
        let transactions = vec![
            create_test_transaction(1, "Arthur Shelby", "X", 10.0),
            create_test_transaction(2, "Tom Shelby", "X", 30.0),
            create_test_transaction(3, "Arthur Shelby", "X", 20.0),
        ];

        let top = engine.top_sender(&transactions).unwrap();
        assert_eq!(top.name, "Arthur Shelby");
        assert_eq!(top.total, 30.0);
    }

    #[test]
    fn test_top_sender_merges_case_variants() {
        let engine = TransactionAggregator::new();
        let transactions = vec![
            create_test_transaction(1, "Tom Shelby", "X", 10.0),
            create_test_transaction(2, "Arthur Shelby", "X", 25.0),
            create_test_transaction(3, "TOM SHELBY", "X", 20.0),
        ];

        let top = engine.top_sender(&transactions).unwrap();
        assert_eq!(top.name, "Tom Shelby");
        assert_eq!(top.total, 30.0);
        assert_eq!(
            engine.total_amount_sent_by(&top.name, &transactions).unwrap(),
            top.total
        );
    }

    // ========================================================================
    // PROPERTIES
    // ========================================================================

    #[quickcheck]
    fn prop_total_is_sum_of_sender_totals(raw: Vec<(u8, u8, u16)>) -> TestResult {
        if raw.is_empty() {
            return TestResult::discard();
        }
        let engine = TransactionAggregator::new();
        let transactions = generated_transactions(&raw);

        let mut senders: Vec<String> = transactions
            .iter()
            .map(|tx| fold_case(&tx.sender_full_name))
            .collect();
        senders.sort();
        senders.dedup();

        let by_sender: f64 = senders
            .iter()
            .map(|s| engine.total_amount_sent_by(s, &transactions).unwrap())
            .sum();
        let total = engine.total_amount(&transactions).unwrap();

        TestResult::from_bool((total - by_sender).abs() < 1e-6)
    }

    #[quickcheck]
    fn prop_max_and_clients_ignore_order(raw: Vec<(u8, u8, u16)>) -> TestResult {
        if raw.is_empty() {
            return TestResult::discard();
        }
        let engine = TransactionAggregator::new();
        let transactions = generated_transactions(&raw);
        let mut reversed = transactions.clone();
        reversed.reverse();
        let mut doubled = transactions.clone();
        doubled.extend(transactions.iter().cloned());

        let max = engine.max_amount(&transactions).unwrap();
        let expected_max = transactions.iter().map(|tx| tx.amount).fold(f64::MIN, f64::max);
        let clients = engine.count_unique_clients(&transactions).unwrap();

        TestResult::from_bool(
            max == expected_max
                && max == engine.max_amount(&reversed).unwrap()
                && clients == engine.count_unique_clients(&reversed).unwrap()
                && clients == engine.count_unique_clients(&doubled).unwrap(),
        )
    }

    #[quickcheck]
    fn prop_grouping_partitions_input(raw: Vec<(u8, u8, u16)>) -> TestResult {
        if raw.is_empty() {
            return TestResult::discard();
        }
        let engine = TransactionAggregator::new();
        let transactions = generated_transactions(&raw);
        let groups = engine.transactions_by_beneficiary(&transactions).unwrap();

        let every_beneficiary_keyed = transactions
            .iter()
            .all(|tx| groups.contains_key(tx.beneficiary_full_name.as_str()));
        let groups_homogeneous = groups
            .iter()
            .all(|(name, txs)| txs.iter().all(|tx| tx.beneficiary_full_name == *name));

        // mtn is unique per generated transaction, so sorted mtns compare multisets
        let mut grouped: Vec<i64> = groups.values().flatten().map(|tx| tx.mtn).collect();
        grouped.sort_unstable();
        let input: Vec<i64> = transactions.iter().map(|tx| tx.mtn).collect();

        let order_kept = groups
            .values()
            .all(|txs| txs.windows(2).all(|w| w[0].mtn < w[1].mtn));

        TestResult::from_bool(every_beneficiary_keyed && groups_homogeneous && grouped == input && order_kept)
    }

    #[quickcheck]
    fn prop_top3_sorted_and_sized(raw: Vec<(u8, u8, u16)>) -> TestResult {
        if raw.len() < DEFAULT_TOP_N {
            return TestResult::discard();
        }
        let engine = TransactionAggregator::new();
        let transactions = generated_transactions(&raw);
        let top = engine.top3_transactions_by_amount(&transactions).unwrap();

        let sorted = top.windows(2).all(|w| w[0].amount >= w[1].amount);
        let nothing_larger_left_out = transactions
            .iter()
            .filter(|tx| !top.iter().any(|t| t.mtn == tx.mtn))
            .all(|tx| tx.amount <= top[DEFAULT_TOP_N - 1].amount);

        TestResult::from_bool(top.len() == DEFAULT_TOP_N && sorted && nothing_larger_left_out)
    }

    #[quickcheck]
    fn prop_top_sender_total_is_consistent_and_maximal(raw: Vec<(u8, u8, u16)>) -> TestResult {
        if raw.is_empty() {
            return TestResult::discard();
        }
        let engine = TransactionAggregator::new();
        let transactions = generated_transactions(&raw);
        let top = engine.top_sender(&transactions).unwrap();

        let own_total = engine.total_amount_sent_by(&top.name, &transactions).unwrap();
        let maximal = transactions.iter().all(|tx| {
            engine
                .total_amount_sent_by(&tx.sender_full_name, &transactions)
                .unwrap()
                <= top.total
        });

        TestResult::from_bool(own_total == top.total && maximal)
    }
}
