use super::error::DomainError;

pub const BUILDINGS_ALLOWANCE_TERMS: u32 = 25;
pub const INTANGIBLES_ALLOWANCE_TERMS: u32 = 5;

fn divide(
    column: &'static str,
    numerator: f64,
    denominator: f64,
    label: &'static str,
) -> Result<f64, DomainError> {
    if denominator == 0.0 {
        return Err(DomainError::ZeroDenominator {
            column,
            denominator: label,
        });
    }
    Ok(numerator / denominator)
}

fn finite(column: &'static str, value: f64) -> Result<f64, DomainError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DomainError::NonFinite { column, value })
    }
}

/// Sum of `ratio^1 + ratio^2 + ... + ratio^terms`, added left to right.
///
/// Each power is raised independently with `powf` rather than accumulated by repeated
/// multiplication, so results stay bit-identical with a term-by-term power series.
pub fn truncated_geometric_sum(ratio: f64, terms: u32) -> f64 {
    (1..=terms).fold(0.0, |sum, k| sum + ratio.powf(f64::from(k)))
}

/// Fisher relation.
pub fn nominal_interest_rate(r: f64, inf: f64) -> Result<f64, DomainError> {
    finite("i", (1.0 + r) * (1.0 + inf) - 1.0)
}

pub fn accruals_equivalent_cgt_rate(mi: f64, zc: f64, l: f64, i: f64) -> Result<f64, DomainError> {
    let z = divide("z", l * zc, l + (1.0 - mi) * i, "l + (1 - mi) * i")?;
    finite("z", z)
}

/// Shared by the corporate-only (`p`) and combined (`p1`) discount rates; `column` names the
/// call site.
pub fn shareholder_discount_rate(
    column: &'static str,
    mi: f64,
    z: f64,
    i: f64,
) -> Result<f64, DomainError> {
    let p = divide(column, 1.0 - mi, 1.0 - z, "1 - z")? * i;
    finite(column, p)
}

/// Shared by `y` and `y1`, which currently read the same inputs.
pub fn tax_discrimination(
    column: &'static str,
    td: f64,
    t: f64,
    md: f64,
    z: f64,
    c: f64,
) -> Result<f64, DomainError> {
    let distribution = divide(column, 1.0 - td, 1.0 - t, "1 - t")?;
    let personal = divide(column, 1.0 - md, (1.0 - z) * (1.0 - c), "(1 - z) * (1 - c)")?;
    finite(column, distribution * personal)
}

/// Declining-balance allowance over an infinite horizon, discounted at `p`.
pub fn machinery_allowance(
    column: &'static str,
    t: f64,
    am: f64,
    p: f64,
) -> Result<f64, DomainError> {
    let value = divide(column, t * am, am + p, "am + p")?;
    finite(column, value)
}

// The buildings series decays at the machinery rate `am`, not `ab`.
pub fn buildings_allowance(
    column: &'static str,
    t: f64,
    ab: f64,
    am: f64,
    p: f64,
) -> Result<f64, DomainError> {
    let first_year = divide(column, t * ab, ab + p, "ab + p")?;
    let ratio = divide(column, 1.0 - am, 1.0 + p, "1 + p")?;
    finite(
        column,
        first_year * truncated_geometric_sum(ratio, BUILDINGS_ALLOWANCE_TERMS),
    )
}

pub fn intangibles_allowance(
    column: &'static str,
    t: f64,
    ai: f64,
    p: f64,
) -> Result<f64, DomainError> {
    let first_year = divide(column, t * ai, ai + p, "ai + p")?;
    let ratio = divide(column, 1.0 - ai, 1.0 + p, "1 + p")?;
    finite(
        column,
        first_year * truncated_geometric_sum(ratio, INTANGIBLES_ALLOWANCE_TERMS),
    )
}

/// `e` is the real-estate surcharge; the exempt variant passes `0.0`.
pub fn new_equity_cost(
    column: &'static str,
    i: f64,
    y: f64,
    e: f64,
) -> Result<f64, DomainError> {
    let value = -divide(column, i * (1.0 - y) * (1.0 + e), 1.0 + i, "1 + i")?;
    finite(column, value)
}

pub fn debt_cost(
    column: &'static str,
    y: f64,
    e: f64,
    i: f64,
    p: f64,
    t: f64,
) -> Result<f64, DomainError> {
    let value = divide(column, y * (1.0 + e) * (p - i * (1.0 - t)), 1.0 + p, "1 + p")?;
    finite(column, value)
}

pub fn economic_rent(pe: f64, r: f64) -> Result<f64, DomainError> {
    let value = divide("Rs", pe - r, 1.0 + r, "1 + r")?;
    finite("Rs", value)
}
