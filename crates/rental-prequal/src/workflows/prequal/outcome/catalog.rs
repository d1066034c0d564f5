use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use super::table::{OutcomeEntry, OutcomeTable};
use super::{Outcome, OutcomeCode, OutcomeQuery};
use crate::workflows::prequal::classifier::{
    EmploymentClassifier, EmploymentTypeCode, ResponsibilityClass,
};
use crate::workflows::prequal::errors::DomainError;
use crate::workflows::prequal::variant::{VariantFamily, WorkflowVariant};

/// Where a variant's generated outcome codes live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLayout {
    pub variant: WorkflowVariant,
    pub first: u32,
    pub last: u32,
}

impl TableLayout {
    const fn new(variant: WorkflowVariant, first: u32, last: u32) -> Self {
        Self {
            variant,
            first,
            last,
        }
    }

    pub fn range(&self) -> RangeInclusive<u32> {
        self.first..=self.last
    }

    fn capacity(&self) -> usize {
        self.last.saturating_sub(self.first) as usize + 1
    }
}

pub const STANDARD_LAYOUTS: [TableLayout; 13] = [
    TableLayout::new(WorkflowVariant::Ls1, 10000, 10499),
    TableLayout::new(WorkflowVariant::Ls2, 10500, 10999),
    TableLayout::new(WorkflowVariant::Ls3, 11000, 11499),
    TableLayout::new(WorkflowVariant::Ls4, 11500, 11999),
    TableLayout::new(WorkflowVariant::Csg1, 20000, 20499),
    TableLayout::new(WorkflowVariant::Csg2, 20500, 20999),
    TableLayout::new(WorkflowVariant::Csg3, 21000, 21499),
    TableLayout::new(WorkflowVariant::Nls1, 30000, 30199),
    TableLayout::new(WorkflowVariant::Nls2, 30200, 30399),
    TableLayout::new(WorkflowVariant::Nls3, 30400, 30599),
    TableLayout::new(WorkflowVariant::Oth1, 40000, 40199),
    TableLayout::new(WorkflowVariant::Oth2, 40200, 40399),
    TableLayout::new(WorkflowVariant::Oth3, 40400, 40599),
];

/// Class whose employment codes key a variant's table.
fn table_class(variant: WorkflowVariant) -> Option<ResponsibilityClass> {
    match variant.family() {
        VariantFamily::GroupIntake => None,
        VariantFamily::Leaseholder => Some(ResponsibilityClass::Responsible),
        VariantFamily::CoSigner => Some(ResponsibilityClass::Guarantor),
        VariantFamily::NotResponsibleLeaseholder | VariantFamily::OtherOccupant => {
            Some(ResponsibilityClass::NotResponsible)
        }
    }
}

/// Every employment code a variant can classify into: students first.
pub(crate) fn employment_codes_for(
    variant: WorkflowVariant,
    classifier: &EmploymentClassifier,
) -> Result<Vec<EmploymentTypeCode>, DomainError> {
    let class = table_class(variant).ok_or(DomainError::NoOutcomeAxis { variant })?;
    Ok([true, false]
        .into_iter()
        .flat_map(|is_student| classifier.codes_for(class, is_student))
        .collect())
}

/// Validated outcome tables for every credit-bearing variant.
#[derive(Debug, Clone)]
pub struct OutcomeCatalog {
    tables: BTreeMap<WorkflowVariant, OutcomeTable>,
}

impl OutcomeCatalog {
    pub fn standard() -> Result<Self, DomainError> {
        Self::from_layouts(&STANDARD_LAYOUTS, EmploymentClassifier::shared()?)
    }

    pub fn from_layouts(
        layouts: &[TableLayout],
        classifier: &EmploymentClassifier,
    ) -> Result<Self, DomainError> {
        let mut tables = BTreeMap::new();
        for layout in layouts {
            let table = Self::generate(layout, classifier)?;
            tables.insert(layout.variant, table);
        }

        for variant in WorkflowVariant::ALL {
            if variant.has_credit_axis() && !tables.contains_key(&variant) {
                return Err(DomainError::IncompleteOutcomeTable {
                    variant,
                    expected: 1,
                    found: 0,
                });
            }
        }

        tracing::debug!(tables = tables.len(), "outcome catalog validated");
        Ok(Self { tables })
    }

    /// Assign codes sequentially over employment code × axis key.
    fn generate(
        layout: &TableLayout,
        classifier: &EmploymentClassifier,
    ) -> Result<OutcomeTable, DomainError> {
        let variant = layout.variant;
        let codes = employment_codes_for(variant, classifier)?;
        let keys = OutcomeTable::keys_for(variant.outcome_axis());

        let needed = codes.len() * keys.len();
        if needed > layout.capacity() {
            return Err(DomainError::IncompleteOutcomeTable {
                variant,
                expected: needed,
                found: layout.capacity(),
            });
        }

        let entries = codes
            .iter()
            .flat_map(|code| keys.iter().map(move |key| (code, *key)))
            .zip(layout.range())
            .map(|((code, axis_key), raw)| OutcomeEntry {
                employment_type_code: code.clone(),
                axis_key,
                outcome_code: OutcomeCode::new(raw.to_string()),
            })
            .collect();

        OutcomeTable::from_entries(variant, layout.range(), codes, entries)
    }

    /// Swap in a repaired table, e.g. one imported from CSV.
    pub fn replace(&mut self, table: OutcomeTable) {
        self.tables.insert(table.variant(), table);
    }

    pub fn table(&self, variant: WorkflowVariant) -> Result<&OutcomeTable, DomainError> {
        self.tables
            .get(&variant)
            .ok_or(DomainError::NoOutcomeAxis { variant })
    }

    pub fn tables(&self) -> impl Iterator<Item = &OutcomeTable> {
        self.tables.values()
    }

    pub fn resolve(
        &self,
        variant: WorkflowVariant,
        code: &EmploymentTypeCode,
        query: OutcomeQuery,
    ) -> Result<Outcome, DomainError> {
        self.table(variant)?.resolve(code, query)
    }
}
