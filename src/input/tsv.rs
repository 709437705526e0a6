use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::input::InputError;
use crate::model::matrix::ExpressionMatrix;

/// Dense expression TSV: a header row of sample identifiers (first field is
/// the gene-column caption and is ignored), then one row per gene.
pub fn read_matrix(path: &Path) -> Result<ExpressionMatrix, InputError> {
    let content = fs::read_to_string(path)?;
    let mut lines = content.lines().enumerate();

    let (_, header) = lines.next().ok_or_else(|| parse_err(path, 1, "empty file"))?;
    let samples: Vec<String> = header
        .split('\t')
        .skip(1)
        .map(|s| s.trim().to_string())
        .collect();
    if samples.is_empty() {
        return Err(parse_err(path, 1, "header has no sample columns"));
    }

    let mut genes = Vec::new();
    let mut values = Vec::new();
    for (idx, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split('\t');
        let gene = fields
            .next()
            .ok_or_else(|| parse_err(path, idx + 1, "missing gene identifier"))?;
        genes.push(gene.trim().to_string());

        let mut count = 0usize;
        for field in fields {
            let value: f64 = field.trim().parse().map_err(|_| {
                parse_err(path, idx + 1, &format!("not a number: {field:?}"))
            })?;
            values.push(value);
            count += 1;
        }
        if count != samples.len() {
            return Err(parse_err(
                path,
                idx + 1,
                &format!("expected {} values, found {count}", samples.len()),
            ));
        }
    }

    Ok(ExpressionMatrix::new(genes, samples, values)?)
}

/// Label TSV: `sample<TAB>fine_label[<TAB>main_label]`, no header.
pub fn read_labels(
    path: &Path,
) -> Result<HashMap<String, (String, Option<String>)>, InputError> {
    let content = fs::read_to_string(path)?;
    let mut map = HashMap::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        match fields.as_slice() {
            [sample, fine] => {
                map.insert(sample.to_string(), (fine.to_string(), None));
            }
            [sample, fine, main] => {
                map.insert(
                    sample.to_string(),
                    (fine.to_string(), Some(main.to_string())),
                );
            }
            _ => {
                return Err(parse_err(path, idx + 1, "expected 2 or 3 tab-separated fields"));
            }
        }
    }
    Ok(map)
}

/// Align a label table with a matrix's sample order. Main labels must be
/// present for every sample or for none.
pub fn align_labels(
    samples: &[String],
    labels: &HashMap<String, (String, Option<String>)>,
) -> Result<(Vec<String>, Option<Vec<String>>), InputError> {
    let mut fine = Vec::with_capacity(samples.len());
    let mut main = Vec::with_capacity(samples.len());
    let mut n_main = 0usize;

    for sample in samples {
        let (f, m) = labels
            .get(sample)
            .ok_or_else(|| InputError::MissingLabel(sample.clone()))?;
        fine.push(f.clone());
        if let Some(m) = m {
            n_main += 1;
            main.push(m.clone());
        }
    }

    if n_main == 0 {
        Ok((fine, None))
    } else if n_main == samples.len() {
        Ok((fine, Some(main)))
    } else {
        Err(InputError::MixedMainLabels)
    }
}

/// Cluster TSV: `sample<TAB>cluster`, no header.
pub fn read_clusters(path: &Path) -> Result<HashMap<String, String>, InputError> {
    let content = fs::read_to_string(path)?;
    let mut map = HashMap::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        let [sample, cluster] = fields.as_slice() else {
            return Err(parse_err(path, idx + 1, "expected 2 tab-separated fields"));
        };
        map.insert(sample.to_string(), cluster.to_string());
    }
    Ok(map)
}

/// One gene identifier per line.
pub fn read_gene_list(path: &Path) -> Result<Vec<String>, InputError> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

fn parse_err(path: &Path, line: usize, msg: &str) -> InputError {
    InputError::Parse {
        path: path.display().to_string(),
        line,
        msg: msg.to_string(),
    }
}
