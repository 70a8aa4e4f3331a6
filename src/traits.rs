use crate::correction::CorrectionInputs;
use crate::sink::Row;

/// Correction-factor lookup
///
/// All inputs are passed explicitly; implementations must not depend on
/// state left over from earlier lookups.
pub trait Correct {
    type Error;

    fn correction(
        &mut self,
        inputs: &CorrectionInputs,
    ) -> Result<f64, Self::Error>;
}

/// Sink for committed table rows
pub trait WriteRow {
    type Error;

    /// Write one row; called exactly once per committed event
    fn write_row(&mut self, row: Row<'_>) -> Result<(), Self::Error>;

    /// Flush any buffered output
    fn finish(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
