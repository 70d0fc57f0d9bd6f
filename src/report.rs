// 🧾 Insights Report - Every aggregate over one dataset, bundled
//
// The report owns its data (names and transactions are cloned out of the
// dataset) so it can be serialized or kept after the dataset is dropped.

use crate::aggregator::{TopSender, TransactionAggregator, DEFAULT_TOP_N};
use crate::errors::AggregationResult;
use crate::model::Transaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// REPORT OPTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportOptions {
    /// Sender whose total sent amount is reported
    pub sender: String,

    /// Client checked for open compliance issues
    pub client: String,

    /// Size of the amount ranking
    pub top_n: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        ReportOptions {
            sender: "Tom Shelby".to_string(),
            client: "Alfie Solomons".to_string(),
            top_n: DEFAULT_TOP_N,
        }
    }
}

// ============================================================================
// INSIGHTS REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsReport {
    pub transaction_count: usize,
    pub total_amount: f64,
    pub sender: String,
    pub total_sent_by_sender: f64,
    pub max_amount: f64,
    pub unique_clients: usize,
    pub client: String,
    pub client_has_no_open_issues: bool,
    pub open_issue_count: usize,
    /// Beneficiary name → number of transactions received
    pub transactions_per_beneficiary: BTreeMap<String, usize>,
    pub unsolved_issue_ids: BTreeSet<i64>,
    pub solved_issue_messages: Vec<String>,
    pub top_transactions: Vec<Transaction>,
    pub top_sender: TopSender,
    pub generated_at: DateTime<Utc>,
}

impl InsightsReport {
    /// Run every aggregate over `transactions`. Fails if any aggregate fails.
    pub fn build(transactions: &[Transaction], options: &ReportOptions) -> AggregationResult<Self> {
        let engine = TransactionAggregator::new();

        let open_issues = engine.open_compliance_issues(&options.client, transactions)?;
        let transactions_per_beneficiary = engine
            .transactions_by_beneficiary(transactions)?
            .into_iter()
            .map(|(name, group)| (name.to_string(), group.len()))
            .collect();

        Ok(InsightsReport {
            transaction_count: transactions.len(),
            total_amount: engine.total_amount(transactions)?,
            sender: options.sender.clone(),
            total_sent_by_sender: engine.total_amount_sent_by(&options.sender, transactions)?,
            max_amount: engine.max_amount(transactions)?,
            unique_clients: engine.count_unique_clients(transactions)?,
            client: options.client.clone(),
            client_has_no_open_issues: open_issues.is_empty(),
            open_issue_count: open_issues.len(),
            transactions_per_beneficiary,
            unsolved_issue_ids: engine.unsolved_issue_ids(transactions)?,
            solved_issue_messages: engine
                .solved_issue_messages(transactions)?
                .into_iter()
                .map(str::to_string)
                .collect(),
            top_transactions: engine
                .top_transactions_by_amount(options.top_n, transactions)?
                .into_iter()
                .cloned()
                .collect(),
            top_sender: engine.top_sender(transactions)?,
            generated_at: Utc::now(),
        })
    }

    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Transactions: {}", self.transaction_count),
            format!("Total transaction amount: {:.2}", self.total_amount),
            format!(
                "Total amount sent by {}: {:.2}",
                self.sender, self.total_sent_by_sender
            ),
            format!("Maximum transaction amount: {:.2}", self.max_amount),
            format!("Unique clients: {}", self.unique_clients),
            format!(
                "{} has {} open compliance issue(s){}",
                self.client,
                self.open_issue_count,
                if self.client_has_no_open_issues { " - clear" } else { "" }
            ),
            "Transactions per beneficiary:".to_string(),
        ];

        for (name, count) in &self.transactions_per_beneficiary {
            lines.push(format!("  {}: {}", name, count));
        }

        lines.push(format!(
            "Unsolved issue ids: {:?}",
            self.unsolved_issue_ids.iter().collect::<Vec<_>>()
        ));

        lines.push(format!("Solved issue messages: {}", self.solved_issue_messages.len()));
        for message in &self.solved_issue_messages {
            lines.push(format!("  - {}", message));
        }

        lines.push(format!("Top {} transactions by amount:", self.top_transactions.len()));
        for tx in &self.top_transactions {
            lines.push(format!(
                "  #{} {:.2} ({} -> {})",
                tx.mtn, tx.amount, tx.sender_full_name, tx.beneficiary_full_name
            ));
        }

        lines.push(format!(
            "Top sender: {} ({:.2})",
            self.top_sender.name, self.top_sender.total
        ));

        lines.join("\n")
    }
}

// ============================================================================
// TESTS
// ============================================================================
