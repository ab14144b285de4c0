//! Report generation: CSV downloads and printable HTML documents for fee
//! collections, expenses and incomes.
//!
//! The printable path produces a self-contained HTML page that opens the
//! browser's print dialog; PDF rasterization stays outside this service.
//! Status and due amounts are re-derived from the stored amounts rather than
//! trusting the cached status column.

use anyhow::Result;
use chrono::Utc;
use log::info;
use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::domain::reconciliation::{self, round_currency};
use crate::backend::storage::{
    ExpenseStorage, FeeStorage, FeeTypeStorage, IncomeStorage, InstituteStorage, ReferenceStorage,
};
use shared::{FeeReportQuery, FeeStatus, Institute};

/// A generated file: content plus the filename to serve it under.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub filename: String,
    pub content: String,
}

struct FeeReportRow {
    student_name: String,
    fee_title: String,
    amount_paid: f64,
    discount: f64,
    waiver_amount: f64,
    status: FeeStatus,
    due_amount: f64,
}

#[derive(Clone)]
pub struct ReportService {
    fees: Arc<dyn FeeStorage>,
    fee_types: Arc<dyn FeeTypeStorage>,
    expenses: Arc<dyn ExpenseStorage>,
    incomes: Arc<dyn IncomeStorage>,
    reference: Arc<dyn ReferenceStorage>,
    institute: Arc<dyn InstituteStorage>,
}

impl ReportService {
    pub fn new(
        fees: Arc<dyn FeeStorage>,
        fee_types: Arc<dyn FeeTypeStorage>,
        expenses: Arc<dyn ExpenseStorage>,
        incomes: Arc<dyn IncomeStorage>,
        reference: Arc<dyn ReferenceStorage>,
        institute: Arc<dyn InstituteStorage>,
    ) -> Self {
        Self {
            fees,
            fee_types,
            expenses,
            incomes,
            reference,
            institute,
        }
    }

    async fn fee_rows(
        &self,
        academic_year: &str,
        student_id: Option<&str>,
    ) -> Result<Vec<FeeReportRow>> {
        let records = self.fees.list_fees(academic_year, student_id).await?;
        let fee_types: HashMap<String, shared::FeeType> = self
            .fee_types
            .list_fee_types(academic_year)
            .await?
            .into_iter()
            .map(|f| (f.id.clone(), f))
            .collect();

        let mut rows = Vec::new();
        for record in records {
            let student_name = match self.reference.get_student(&record.student_id).await? {
                Some(student) => student.name,
                None => record.student_id.clone(),
            };
            let (fee_title, nominal) = match fee_types.get(&record.fee_type_id) {
                Some(fee_type) => (fee_type.title.clone(), fee_type.amount),
                None => (record.fee_type_id.clone(), record.amount),
            };

            // Re-derive status from the stored amounts; late fees are not
            // reconstructible after the fact and are omitted here.
            let payable = round_currency(nominal - record.waiver_amount);
            let discount = record.discount.min(payable);
            let outcome = reconciliation::derive_status(payable, discount, record.amount, 0.0)?;

            rows.push(FeeReportRow {
                student_name,
                fee_title,
                amount_paid: record.amount,
                discount: record.discount,
                waiver_amount: record.waiver_amount,
                status: outcome.status,
                due_amount: outcome.due_amount,
            });
        }

        Ok(rows)
    }

    /// Fee collection report as CSV content plus a dated filename.
    pub async fn fee_report_csv(&self, query: &FeeReportQuery) -> Result<ReportDocument> {
        let rows = self
            .fee_rows(&query.academic_year, query.student_id.as_deref())
            .await?;

        let mut csv_content = String::new();
        csv_content.push_str("student,fee_type,amount_paid,discount,waiver,status,due\n");
        for row in &rows {
            csv_content.push_str(&format!(
                "\"{}\",\"{}\",{:.2},{:.2},{:.2},{},{:.2}\n",
                row.student_name.replace('"', "\"\""),
                row.fee_title.replace('"', "\"\""),
                row.amount_paid,
                row.discount,
                row.waiver_amount,
                row.status,
                row.due_amount,
            ));
        }

        let filename = format!(
            "fee_collections_{}_{}.csv",
            query.academic_year,
            Utc::now().format("%Y%m%d")
        );

        info!(
            "Generated fee collection CSV for {} ({} rows, {} bytes)",
            query.academic_year,
            rows.len(),
            csv_content.len()
        );

        Ok(ReportDocument {
            filename,
            content: csv_content,
        })
    }

    /// Fee collection report as a printable HTML document.
    pub async fn fee_report_html(&self, query: &FeeReportQuery) -> Result<String> {
        let institute = self.institute.get_institute().await?;
        let rows = self
            .fee_rows(&query.academic_year, query.student_id.as_deref())
            .await?;

        let total_collected: f64 = rows.iter().map(|r| r.amount_paid).sum();
        let total_due: f64 = rows.iter().map(|r| r.due_amount).sum();

        let mut body = String::new();
        for row in &rows {
            body.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td class=\"num\">{:.2}</td><td class=\"num\">{:.2}</td><td class=\"num\">{:.2}</td><td>{}</td><td class=\"num\">{:.2}</td></tr>\n",
                escape_html(&row.student_name),
                escape_html(&row.fee_title),
                row.amount_paid,
                row.discount,
                row.waiver_amount,
                row.status,
                row.due_amount,
            ));
        }

        let table = format!(
            "<table>\n<thead><tr><th>Student</th><th>Fee</th><th>Paid</th><th>Discount</th><th>Waiver</th><th>Status</th><th>Due</th></tr></thead>\n<tbody>\n{}</tbody>\n<tfoot><tr><th colspan=\"2\">Totals</th><th class=\"num\">{:.2}</th><th colspan=\"3\"></th><th class=\"num\">{:.2}</th></tr></tfoot>\n</table>",
            body, round_currency(total_collected), round_currency(total_due)
        );

        Ok(print_document(
            &institute,
            "Fee Collection Report",
            &query.academic_year,
            &table,
        ))
    }

    /// Expense report as CSV content plus a dated filename.
    pub async fn expense_report_csv(&self, academic_year: &str) -> Result<ReportDocument> {
        let expenses = self.expenses.list_expenses(academic_year).await?;

        let mut csv_content = String::new();
        csv_content.push_str("date,title,fund,amount\n");
        for expense in &expenses {
            csv_content.push_str(&format!(
                "{},\"{}\",{},{:.2}\n",
                expense.expense_date,
                expense.title.replace('"', "\"\""),
                expense.fund_id,
                expense.amount,
            ));
        }

        let filename = format!(
            "expenses_{}_{}.csv",
            academic_year,
            Utc::now().format("%Y%m%d")
        );

        info!(
            "Generated expense CSV for {} ({} rows)",
            academic_year,
            expenses.len()
        );

        Ok(ReportDocument {
            filename,
            content: csv_content,
        })
    }

    /// Expense report as a printable HTML document.
    pub async fn expense_report_html(&self, academic_year: &str) -> Result<String> {
        let institute = self.institute.get_institute().await?;
        let expenses = self.expenses.list_expenses(academic_year).await?;
        let total: f64 = expenses.iter().map(|e| e.amount).sum();

        let mut body = String::new();
        for expense in &expenses {
            body.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td class=\"num\">{:.2}</td></tr>\n",
                expense.expense_date,
                escape_html(&expense.title),
                escape_html(&expense.fund_id),
                expense.amount,
            ));
        }

        let table = format!(
            "<table>\n<thead><tr><th>Date</th><th>Title</th><th>Fund</th><th>Amount</th></tr></thead>\n<tbody>\n{}</tbody>\n<tfoot><tr><th colspan=\"3\">Total</th><th class=\"num\">{:.2}</th></tr></tfoot>\n</table>",
            body,
            round_currency(total)
        );

        Ok(print_document(
            &institute,
            "Expense Report",
            academic_year,
            &table,
        ))
    }

    /// Income report as CSV content plus a dated filename.
    pub async fn income_report_csv(&self, academic_year: &str) -> Result<ReportDocument> {
        let incomes = self.incomes.list_incomes(academic_year).await?;

        let mut csv_content = String::new();
        csv_content.push_str("date,title,fund,amount\n");
        for income in &incomes {
            csv_content.push_str(&format!(
                "{},\"{}\",{},{:.2}\n",
                income.income_date,
                income.title.replace('"', "\"\""),
                income.fund_id,
                income.amount,
            ));
        }

        let filename = format!(
            "incomes_{}_{}.csv",
            academic_year,
            Utc::now().format("%Y%m%d")
        );

        info!(
            "Generated income CSV for {} ({} rows)",
            academic_year,
            incomes.len()
        );

        Ok(ReportDocument {
            filename,
            content: csv_content,
        })
    }

    /// Income report as a printable HTML document.
    pub async fn income_report_html(&self, academic_year: &str) -> Result<String> {
        let institute = self.institute.get_institute().await?;
        let incomes = self.incomes.list_incomes(academic_year).await?;
        let total: f64 = incomes.iter().map(|i| i.amount).sum();

        let mut body = String::new();
        for income in &incomes {
            body.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td class=\"num\">{:.2}</td></tr>\n",
                income.income_date,
                escape_html(&income.title),
                escape_html(&income.fund_id),
                income.amount,
            ));
        }

        let table = format!(
            "<table>\n<thead><tr><th>Date</th><th>Title</th><th>Fund</th><th>Amount</th></tr></thead>\n<tbody>\n{}</tbody>\n<tfoot><tr><th colspan=\"3\">Total</th><th class=\"num\">{:.2}</th></tr></tfoot>\n</table>",
            body,
            round_currency(total)
        );

        Ok(print_document(
            &institute,
            "Income Report",
            academic_year,
            &table,
        ))
    }
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Wrap a table in a self-contained page that opens the print dialog on load.
fn print_document(institute: &Institute, title: &str, academic_year: &str, table: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; margin: 2em; }}
h1 {{ margin-bottom: 0; }}
.meta {{ color: #555; margin-bottom: 1.5em; }}
table {{ border-collapse: collapse; width: 100%; }}
th, td {{ border: 1px solid #999; padding: 4px 8px; text-align: left; }}
td.num, th.num {{ text-align: right; }}
tfoot th {{ background: #eee; }}
</style>
</head>
<body onload="window.print()">
<h1>{institute_name}</h1>
<div class="meta">{institute_address}<br>{title} &middot; Academic Year {academic_year}<br>Generated {generated}</div>
{table}
</body>
</html>
"#,
        title = title,
        institute_name = escape_html(&institute.name),
        institute_address = escape_html(&institute.address),
        academic_year = escape_html(academic_year),
        generated = Utc::now().format("%Y-%m-%d"),
        table = table,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::csv::test_utils::{
        sample_expense, sample_fee_record, sample_fee_type, sample_income, sample_student,
        TEST_YEAR,
    };
    use crate::backend::storage::csv::{
        CsvConnection, ExpenseRepository, FeeRepository, FeeTypeRepository, IncomeRepository,
        InstituteRepository, ReferenceRepository,
    };
    use crate::backend::storage::{
        ExpenseStorage as _, FeeStorage as _, FeeTypeStorage as _, IncomeStorage as _,
    };

    struct Fixture {
        _temp_dir: tempfile::TempDir,
        service: ReportService,
        fees: Arc<FeeRepository>,
        fee_types: Arc<FeeTypeRepository>,
        expenses: Arc<ExpenseRepository>,
        incomes: Arc<IncomeRepository>,
    }

    fn setup() -> Fixture {
        let temp_dir = tempfile::tempdir().unwrap();
        let connection = CsvConnection::new(temp_dir.path()).unwrap();

        let fees = Arc::new(FeeRepository::new(connection.clone()));
        let fee_types = Arc::new(FeeTypeRepository::new(connection.clone()));
        let expenses = Arc::new(ExpenseRepository::new(connection.clone()));
        let incomes = Arc::new(IncomeRepository::new(connection.clone()));
        let reference = Arc::new(ReferenceRepository::new(connection.clone()));
        let institute = Arc::new(InstituteRepository::new(connection));

        reference
            .store_student(&sample_student("student-1", "user-1", "Asha Rahman"))
            .unwrap();

        let service = ReportService::new(
            fees.clone(),
            fee_types.clone(),
            expenses.clone(),
            incomes.clone(),
            reference,
            institute,
        );

        Fixture {
            _temp_dir: temp_dir,
            service,
            fees,
            fee_types,
            expenses,
            incomes,
        }
    }

    #[tokio::test]
    async fn test_fee_report_csv_rederives_due() {
        let fixture = setup();
        fixture
            .fee_types
            .store_fee_type(&sample_fee_type("feetype::1", "head-1", 1000.0, None))
            .await
            .unwrap();

        let mut record = sample_fee_record("fee::1", "feetype::1", "student-1", TEST_YEAR);
        record.amount = 400.0;
        record.waiver_amount = 100.0;
        fixture.fees.store_fee(&record).await.unwrap();

        let document = fixture
            .service
            .fee_report_csv(&FeeReportQuery {
                academic_year: TEST_YEAR.to_string(),
                student_id: None,
                format: None,
            })
            .await
            .unwrap();

        assert!(document.filename.starts_with("fee_collections_2025-2026_"));
        // payable 900, paid 400 -> due 500, PARTIAL
        assert!(document.content.contains("\"Asha Rahman\""));
        assert!(document.content.contains("PARTIAL,500.00"));
    }

    #[tokio::test]
    async fn test_fee_report_html_contains_institute_header() {
        let fixture = setup();
        let html = fixture
            .service
            .fee_report_html(&FeeReportQuery {
                academic_year: TEST_YEAR.to_string(),
                student_id: None,
                format: Some("print".to_string()),
            })
            .await
            .unwrap();

        assert!(html.contains("<h1>Unnamed Institute</h1>"));
        assert!(html.contains("window.print()"));
        assert!(html.contains("Fee Collection Report"));
    }

    #[tokio::test]
    async fn test_expense_report_totals() {
        let fixture = setup();
        fixture
            .expenses
            .store_expense(&sample_expense("expense::1", "Lab equipment", 1200.0))
            .await
            .unwrap();
        fixture
            .expenses
            .store_expense(&sample_expense("expense::2", "Chalk", 20.5))
            .await
            .unwrap();

        let html = fixture
            .service
            .expense_report_html(TEST_YEAR)
            .await
            .unwrap();
        assert!(html.contains("1220.50"));

        let document = fixture.service.expense_report_csv(TEST_YEAR).await.unwrap();
        assert!(document.content.contains("\"Lab equipment\""));
    }

    #[tokio::test]
    async fn test_income_report_lists_rows() {
        let fixture = setup();
        fixture
            .incomes
            .store_income(&sample_income("income::1", "Admission forms", 300.0))
            .await
            .unwrap();

        let document = fixture.service.income_report_csv(TEST_YEAR).await.unwrap();
        assert!(document.content.contains("Admission forms"));
        assert!(document.content.contains("300.00"));
    }
}
