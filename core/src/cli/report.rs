use crate::table::ResultTable;
use std::fmt;

/// Text report formatter for a finished batch
pub struct TextReport<'a> {
    table: &'a ResultTable,
}

impl<'a> TextReport<'a> {
    /// Creates a new text report
    pub fn new(table: &'a ResultTable) -> Self {
        Self { table }
    }
}

impl<'a> fmt::Display for TextReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Radiomics Extraction")?;
        writeln!(f, "====================")?;
        writeln!(f)?;
        writeln!(f, "Cases:          {}", self.table.len())?;
        writeln!(f, "Succeeded:      {}", self.table.success_count())?;
        writeln!(f, "Failed:         {}", self.table.failure_count())?;
        writeln!(f, "Features:       {}", self.table.feature_columns().len())?;

        if self.table.is_empty() {
            return Ok(());
        }

        writeln!(f)?;
        writeln!(f, "Cases")?;
        writeln!(f, "-----")?;
        for row in self.table.rows() {
            match (row.features(), row.error()) {
                (Some(features), _) => {
                    writeln!(f, "{}: {} features", row.name(), features.len())?
                }
                (None, Some(error)) => writeln!(f, "{}: FAILED ({})", row.name(), error)?,
                (None, None) => writeln!(f, "{}", row.name())?,
            }
        }

        Ok(())
    }
}
