use serde::Serialize;

use super::error::{DomainError, MissingParameterError};

pub const PARAMETER_COLUMNS: [&str; 18] = [
    "t", "ai", "ab", "am", "v", "mi", "md", "zc", "c", "e", "td", "r", "inf", "di", "db", "dm",
    "pe", "l",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParameterRow {
    pub t: f64,
    pub ai: f64,
    pub ab: f64,
    pub am: f64,
    pub v: f64,
    pub mi: f64,
    pub md: f64,
    pub zc: f64,
    pub c: f64,
    pub e: f64,
    pub td: f64,
    pub r: f64,
    pub inf: f64,
    pub di: f64,
    pub db: f64,
    pub dm: f64,
    pub pe: f64,
    pub l: f64,
}

impl ParameterRow {
    /// Builds a row by asking `lookup` for every parameter column in canonical order.
    /// The first column it cannot supply rejects the whole row.
    pub fn from_lookup<F>(mut lookup: F) -> Result<Self, MissingParameterError>
    where
        F: FnMut(&'static str) -> Result<f64, MissingParameterError>,
    {
        Ok(Self {
            t: lookup("t")?,
            ai: lookup("ai")?,
            ab: lookup("ab")?,
            am: lookup("am")?,
            v: lookup("v")?,
            mi: lookup("mi")?,
            md: lookup("md")?,
            zc: lookup("zc")?,
            c: lookup("c")?,
            e: lookup("e")?,
            td: lookup("td")?,
            r: lookup("r")?,
            inf: lookup("inf")?,
            di: lookup("di")?,
            db: lookup("db")?,
            dm: lookup("dm")?,
            pe: lookup("pe")?,
            l: lookup("l")?,
        })
    }

    #[cfg(test)]
    pub(crate) fn value(&self, column: &str) -> Option<f64> {
        let value = match column {
            "t" => self.t,
            "ai" => self.ai,
            "ab" => self.ab,
            "am" => self.am,
            "v" => self.v,
            "mi" => self.mi,
            "md" => self.md,
            "zc" => self.zc,
            "c" => self.c,
            "e" => self.e,
            "td" => self.td,
            "r" => self.r,
            "inf" => self.inf,
            "di" => self.di,
            "db" => self.db,
            "dm" => self.dm,
            "pe" => self.pe,
            "l" => self.l,
            _ => return None,
        };
        Some(value)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Metric {
    NominalInterestRate,
    AccrualsCapitalGainsRate,
    DiscountRateCorporate,
    DiscountRateCombined,
    TaxDiscriminationCorporate,
    TaxDiscriminationCombined,
    MachineryAllowance,
    MachineryAllowanceCombined,
    BuildingsAllowance,
    BuildingsAllowanceCombined,
    IntangiblesAllowance,
    IntangiblesAllowanceCombined,
    NewEquityCost,
    NewEquityCostExempt,
    DebtCost,
    DebtCostCombined,
    EconomicRent,
}

impl Metric {
    pub const COUNT: usize = 17;

    pub const ORDER: [Metric; Metric::COUNT] = [
        Metric::NominalInterestRate,
        Metric::AccrualsCapitalGainsRate,
        Metric::DiscountRateCorporate,
        Metric::DiscountRateCombined,
        Metric::TaxDiscriminationCorporate,
        Metric::TaxDiscriminationCombined,
        Metric::MachineryAllowance,
        Metric::MachineryAllowanceCombined,
        Metric::BuildingsAllowance,
        Metric::BuildingsAllowanceCombined,
        Metric::IntangiblesAllowance,
        Metric::IntangiblesAllowanceCombined,
        Metric::NewEquityCost,
        Metric::NewEquityCostExempt,
        Metric::DebtCost,
        Metric::DebtCostCombined,
        Metric::EconomicRent,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Metric::NominalInterestRate => "i",
            Metric::AccrualsCapitalGainsRate => "z",
            Metric::DiscountRateCorporate => "p",
            Metric::DiscountRateCombined => "p1",
            Metric::TaxDiscriminationCorporate => "y",
            Metric::TaxDiscriminationCombined => "y1",
            Metric::MachineryAllowance => "Am",
            Metric::MachineryAllowanceCombined => "Am1",
            Metric::BuildingsAllowance => "Ca",
            Metric::BuildingsAllowanceCombined => "Ca1",
            Metric::IntangiblesAllowance => "Cai",
            Metric::IntangiblesAllowanceCombined => "Cai1",
            Metric::NewEquityCost => "Fne",
            Metric::NewEquityCostExempt => "Fne1",
            Metric::DebtCost => "Fde",
            Metric::DebtCostCombined => "Fde1",
            Metric::EconomicRent => "Rs",
        }
    }

    pub fn from_column(column: &str) -> Option<Metric> {
        Metric::ORDER.into_iter().find(|m| m.column() == column)
    }

    pub fn description(self) -> &'static str {
        match self {
            Metric::NominalInterestRate => "Nominal interest rate",
            Metric::AccrualsCapitalGainsRate => "Accruals-equivalent capital gains tax rate",
            Metric::DiscountRateCorporate => "Shareholder discount rate (corporate taxes)",
            Metric::DiscountRateCombined => {
                "Shareholder discount rate (corporate and personal taxes)"
            }
            Metric::TaxDiscriminationCorporate => "Tax discrimination variable (corporate taxes)",
            Metric::TaxDiscriminationCombined => {
                "Tax discrimination variable (corporate and personal taxes)"
            }
            Metric::MachineryAllowance => "NPV of capital allowances for machinery",
            Metric::MachineryAllowanceCombined => {
                "NPV of capital allowances for machinery (corporate and personal taxes)"
            }
            Metric::BuildingsAllowance => "Capital allowance for buildings",
            Metric::BuildingsAllowanceCombined => {
                "Capital allowance for buildings (corporate and personal taxes)"
            }
            Metric::IntangiblesAllowance => "Capital allowance for intangibles",
            Metric::IntangiblesAllowanceCombined => {
                "Capital allowance for intangibles (corporate and personal taxes)"
            }
            Metric::NewEquityCost => "Additional cost of raising external finance, new equity",
            Metric::NewEquityCostExempt => {
                "Additional cost of raising external finance, new equity without real estate tax"
            }
            Metric::DebtCost => "Additional cost of raising external finance, debt",
            Metric::DebtCostCombined => {
                "Additional cost of raising external finance, debt (corporate and personal taxes)"
            }
            Metric::EconomicRent => "Economic rent of the project in the absence of tax",
        }
    }

    /// Derived columns this metric reads. Raw parameters are not listed.
    pub fn dependencies(self) -> &'static [Metric] {
        use Metric::*;
        match self {
            NominalInterestRate => &[],
            AccrualsCapitalGainsRate => &[NominalInterestRate],
            DiscountRateCorporate | DiscountRateCombined => {
                &[NominalInterestRate, AccrualsCapitalGainsRate]
            }
            TaxDiscriminationCorporate | TaxDiscriminationCombined => &[AccrualsCapitalGainsRate],
            MachineryAllowance | BuildingsAllowance | IntangiblesAllowance => {
                &[DiscountRateCorporate]
            }
            MachineryAllowanceCombined
            | BuildingsAllowanceCombined
            | IntangiblesAllowanceCombined => &[DiscountRateCombined],
            NewEquityCost => &[NominalInterestRate, TaxDiscriminationCorporate],
            NewEquityCostExempt => &[NominalInterestRate, TaxDiscriminationCombined],
            DebtCost => &[
                NominalInterestRate,
                DiscountRateCorporate,
                TaxDiscriminationCorporate,
            ],
            DebtCostCombined => &[
                NominalInterestRate,
                DiscountRateCombined,
                TaxDiscriminationCombined,
            ],
            EconomicRent => &[],
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Unavailable {
    Domain(DomainError),
    Blocked { by: Metric },
}

impl std::fmt::Display for Unavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unavailable::Domain(err) => write!(f, "{err}"),
            Unavailable::Blocked { by } => write!(f, "depends on unavailable '{by}'"),
        }
    }
}

impl From<DomainError> for Unavailable {
    fn from(value: DomainError) -> Self {
        Unavailable::Domain(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedMetrics {
    values: [Option<f64>; Metric::COUNT],
}

impl DerivedMetrics {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.values[metric.index()]
    }

    pub(crate) fn record(&mut self, metric: Metric, value: f64) {
        debug_assert!(
            self.values[metric.index()].is_none(),
            "metric '{metric}' recorded twice"
        );
        self.values[metric.index()] = Some(value);
    }

    #[cfg(test)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = (Metric, Option<f64>)> + '_ {
        Metric::ORDER.into_iter().map(|m| (m, self.get(m)))
    }

    pub fn is_complete(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricIssue {
    pub metric: Metric,
    pub reason: Unavailable,
}

impl std::fmt::Display for MetricIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' unavailable: {}", self.metric, self.reason)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowOutcome {
    pub parameters: ParameterRow,
    pub metrics: DerivedMetrics,
    pub issues: Vec<MetricIssue>,
}

impl RowOutcome {
    pub fn is_flagged(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn issue(&self, metric: Metric) -> Option<&Unavailable> {
        self.issues
            .iter()
            .find(|issue| issue.metric == metric)
            .map(|issue| &issue.reason)
    }
}
