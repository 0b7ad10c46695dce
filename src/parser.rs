// Dump Parser - Employee Records
// Single-pass, line-oriented state machine over the flat-text dump

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::models::{Department, Employee, Statement};

// ============================================================================
// LINE CLASSIFICATION
// ============================================================================

const EMPLOYEE_MARKER: &str = "Employee";
const DEPARTMENT_MARKER: &str = "Department";
const STATEMENT_MARKER: &str = "Statement";

/// One trimmed dump line, classified by prefix.
///
/// Section markers are checked before field prefixes, so precedence is
/// fixed by the order of the checks in `classify`.
#[derive(Debug, Clone, PartialEq)]
pub enum Line<'a> {
    Employee,
    Department,
    Statement,
    Id(Option<&'a str>),
    Name(Option<&'a str>),
    Amount(Option<&'a str>),
    Date(Option<&'a str>),
    Ignored,
}

impl<'a> Line<'a> {
    pub fn classify(trimmed: &'a str) -> Self {
        if trimmed.starts_with(EMPLOYEE_MARKER) {
            Line::Employee
        } else if trimmed.starts_with(DEPARTMENT_MARKER) {
            Line::Department
        } else if trimmed.starts_with(STATEMENT_MARKER) {
            Line::Statement
        } else if trimmed.starts_with("id:") {
            Line::Id(field_value(trimmed, "id: "))
        } else if trimmed.starts_with("name:") {
            Line::Name(field_value(trimmed, "name: "))
        } else if trimmed.starts_with("amount:") {
            Line::Amount(field_value(trimmed, "amount: "))
        } else if trimmed.starts_with("date:") {
            Line::Date(field_value(trimmed, "date: "))
        } else {
            Line::Ignored
        }
    }
}

/// Everything after the first `"<field>: "`, or `None` without the separator
fn field_value<'a>(line: &'a str, separator: &str) -> Option<&'a str> {
    line.find(separator).map(|pos| &line[pos + separator.len()..])
}

/// Amount lines always produce a number; NaN when nothing numeric is there
fn parse_amount(raw: Option<&str>) -> Option<f64> {
    Some(raw.map(leading_float).unwrap_or(f64::NAN))
}

/// Longest leading decimal literal, `parseFloat`-style.
///
/// `"150 USD"` reads as 150 and `"1,500"` as 1. Only the literal
/// `Infinity` is accepted as a word; `inf` and `nan` are not numbers.
pub fn leading_float(value: &str) -> f64 {
    let s = value.trim_start();
    let bytes = s.as_bytes();

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    if s[end..].starts_with("Infinity") {
        return if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }

    if int_digits == 0 && frac_digits == 0 {
        return f64::NAN;
    }

    // Exponent only counts when at least one digit follows it
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(&bytes[exp_end..]);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    s[..end].parse().unwrap_or(f64::NAN)
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

// ============================================================================
// STATE MACHINE
// ============================================================================

/// Which sub-record `id:`/`name:` lines currently belong to.
/// Reset to `TopLevel` at every Employee marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseContext {
    TopLevel,
    InDepartment,
    InStatement,
}

/// Counters for one parse pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseSummary {
    pub employees: usize,
    pub statements: usize,
    pub ignored_lines: usize,
}

#[derive(Debug)]
struct DumpParser {
    employees: Vec<Employee>,
    current: Option<Employee>,
    context: ParseContext,
    /// A Department section was opened for the current employee
    department_open: bool,
    summary: ParseSummary,
}

impl DumpParser {
    fn new() -> Self {
        DumpParser {
            employees: Vec::new(),
            current: None,
            context: ParseContext::TopLevel,
            department_open: false,
            summary: ParseSummary::default(),
        }
    }

    fn feed(&mut self, raw_line: &str) {
        let line = Line::classify(raw_line.trim());

        if line == Line::Employee {
            self.flush();
            self.current = Some(Employee::default());
            self.context = ParseContext::TopLevel;
            self.department_open = false;
            return;
        }

        // Nothing owns lines that appear before the first Employee marker
        let Some(employee) = self.current.as_mut() else {
            self.summary.ignored_lines += 1;
            return;
        };

        let applied = match (line, self.context) {
            (Line::Department, _) => {
                employee.department = Department::default();
                self.context = ParseContext::InDepartment;
                self.department_open = true;
                true
            }
            (Line::Statement, _) => {
                employee.statements.push(Statement::default());
                self.summary.statements += 1;
                self.context = ParseContext::InStatement;
                true
            }
            (Line::Id(value), ParseContext::InStatement) => {
                Self::open_statement(employee).id = value.map(str::to_string);
                true
            }
            (Line::Id(value), ParseContext::InDepartment) => {
                employee.department.id = value.map(str::to_string);
                true
            }
            (Line::Id(value), ParseContext::TopLevel) => {
                employee.id = value.map(str::to_string);
                true
            }
            (Line::Name(value), ParseContext::InDepartment) => {
                employee.department.name = value.map(str::to_string);
                true
            }
            // Statements have no name; it belongs to this employee's department
            (Line::Name(value), ParseContext::InStatement) if self.department_open => {
                employee.department.name = value.map(str::to_string);
                true
            }
            (Line::Name(value), ParseContext::TopLevel) => {
                employee.name = value.map(str::to_string);
                true
            }
            (Line::Amount(value), ParseContext::InStatement) => {
                Self::open_statement(employee).amount = parse_amount(value);
                true
            }
            (Line::Date(value), ParseContext::InStatement) => {
                Self::open_statement(employee).date = value.map(str::to_string);
                true
            }
            _ => false,
        };

        if !applied {
            self.summary.ignored_lines += 1;
        }
    }

    // InStatement is only entered after a push, so the sequence is non-empty
    fn open_statement(employee: &mut Employee) -> &mut Statement {
        if employee.statements.is_empty() {
            employee.statements.push(Statement::default());
        }
        let last = employee.statements.len() - 1;
        &mut employee.statements[last]
    }

    fn flush(&mut self) {
        if let Some(employee) = self.current.take() {
            self.summary.employees += 1;
            self.employees.push(employee);
        }
    }

    fn finish(mut self) -> (Vec<Employee>, ParseSummary) {
        self.flush();
        (self.employees, self.summary)
    }
}

// ============================================================================
// ENTRY POINTS
// ============================================================================

/// Parse dump text into employees. Never fails: malformed sections leave
/// fields unset and unrecognized lines are skipped.
pub fn parse_str(content: &str) -> Vec<Employee> {
    parse_with_summary(content).0
}

/// Same as `parse_str`, also returning the pass counters
pub fn parse_with_summary(content: &str) -> (Vec<Employee>, ParseSummary) {
    let mut parser = DumpParser::new();
    for line in content.lines() {
        parser.feed(line);
    }

    let (employees, summary) = parser.finish();
    debug!(
        employees = summary.employees,
        statements = summary.statements,
        ignored_lines = summary.ignored_lines,
        "parsed employee dump"
    );

    (employees, summary)
}

/// Read a dump file and parse it. Only I/O can fail.
pub fn parse_file(path: &Path) -> Result<Vec<Employee>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read dump file {}", path.display()))?;

    Ok(parse_str(&content))
}
