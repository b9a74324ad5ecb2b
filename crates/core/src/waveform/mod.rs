use serde::{Deserialize, Serialize};

/// Extremes of the samples covered by one pixel column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeColumn {
    pub min: f32,
    pub max: f32,
}

/// Fixed-width min/max summary of a sample buffer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    columns: Vec<EnvelopeColumn>,
}

impl Envelope {
    pub fn columns(&self) -> &[EnvelopeColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Largest absolute extreme across all columns.
    pub fn peak(&self) -> f32 {
        self.columns
            .iter()
            .map(|column| column.min.abs().max(column.max.abs()))
            .fold(0.0, f32::max)
    }

    /// Lower-edge polyline for a surface `height` units tall: one point per
    /// column at `(x, (1 + min) * height / 2)`.
    pub fn trace(&self, height: f32) -> Vec<(f32, f32)> {
        let amp = height / 2.0;
        self.columns
            .iter()
            .enumerate()
            .map(|(x, column)| (x as f32, (1.0 + column.min) * amp))
            .collect()
    }
}

/// Reduces `samples` to `column_count` min/max columns in a single pass.
///
/// Every column covers `ceil(len / column_count)` consecutive samples; the
/// trailing columns that fall past the end of the buffer, and every column of
/// an empty buffer, are `{0, 0}`. A `column_count` of zero yields an empty
/// envelope.
pub fn reduce(samples: &[f32], column_count: usize) -> Envelope {
    let mut columns = vec![EnvelopeColumn::default(); column_count];
    if samples.is_empty() || column_count == 0 {
        return Envelope { columns };
    }

    let step = samples.len().div_ceil(column_count);
    for (column, chunk) in columns.iter_mut().zip(samples.chunks(step)) {
        let (min, max) = chunk
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), &sample| {
                (min.min(sample), max.max(sample))
            });
        *column = EnvelopeColumn { min, max };
    }

    Envelope { columns }
}
