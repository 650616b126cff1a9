//! LibSVM dataset reader (E2), a direct idiomatic port of
//! `DataLoader.h`'s `ReadSvmDatasetHelper`.
use crate::error::{CliError, Result};
use slash::{Labels, SparseVectorSet};
use std::io::BufRead;
use std::path::Path;

/// How to label the rows read from the file.
pub enum LabelSpec {
    Explicit(Vec<u32>),
    Sequential { start: u32 },
}

/// Skip `skip` lines, then parse exactly `n` further lines of
/// `<label> (<index>:<value>)*`, returning a [`SparseVectorSet`].
/// `avg_dim` only sizes the initial index/value buffers; it is not a hard
/// cap. Fewer than `n` lines remaining is a fatal [`CliError::ShortRead`]
/// (spec.md section 7, "Dataset-short-read").
pub fn read_svm_dataset<P: AsRef<Path>>(
    path: P,
    labels: LabelSpec,
    n: usize,
    avg_dim: usize,
    skip: usize,
) -> Result<SparseVectorSet> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);

    let mut indices = Vec::with_capacity(n * avg_dim);
    let mut values = Vec::with_capacity(n * avg_dim);
    let mut markers = Vec::with_capacity(n + 1);
    markers.push(0u32);

    let mut read = 0usize;
    for (lineno, line) in reader.lines().enumerate() {
        if lineno < skip {
            continue;
        }
        let line = line?;
        let mut fields = line.split_whitespace();
        fields.next(); // label is handled by `labels`, per spec.md section 9.5

        for item in fields {
            let colon = item.find(':').ok_or_else(|| {
                CliError::Config(format!("malformed svm token {:?} on line {}", item, lineno + 1))
            })?;
            let index: u32 = item[..colon]
                .parse()
                .map_err(|_| CliError::Config(format!("bad index in {:?}", item)))?;
            let value: f32 = item[colon + 1..]
                .parse()
                .map_err(|_| CliError::Config(format!("bad value in {:?}", item)))?;
            indices.push(index);
            values.push(value);
        }
        markers.push(indices.len() as u32);
        read += 1;
        if read >= n {
            break;
        }
    }

    if read < n {
        return Err(CliError::ShortRead { expected: n, actual: read });
    }

    let label_set = match labels {
        LabelSpec::Explicit(v) => Labels::Explicit(v),
        LabelSpec::Sequential { start } => Labels::Sequential { start },
    };
    log::info!(
        "read {} vectors ({} total nonzeros) from svm file",
        read,
        indices.len()
    );
    Ok(SparseVectorSet::new(indices, values, markers, label_set)?)
}
