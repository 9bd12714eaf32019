/// Flat-file persistence: one append-only results CSV per dimension plus a
/// counts CSV rewritten in full after every judgment.
use anyhow::{bail, Context, Result};
use perceptrank_core::{
    ComparisonRecord, CoverageTable, Dimensions, Outcome, Pair, PersistenceError, PersistentStore, Skill, Summary,
};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const COUNTS_FILE: &str = "image_comparison_counts.csv";
pub const SUMMARY_FILE: &str = "summary.json";
const COUNTS_HEADER: &str = "Image,Dimension,Comparison_Count";
const RECORDS_HEADER: &str = "Subject,Left_Image,Right_Image,Result,Left_Rating,Right_Rating";

pub struct FlatFileStore {
    dir: PathBuf,
}

impl FlatFileStore {
    /// Open `dir` for `dimensions`. Fails if two dimensions would share one
    /// results file.
    pub fn open(dir: &Path, dimensions: &Dimensions) -> Result<Self> {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create data folder {}", dir.display()))?;
        let store = FlatFileStore { dir: dir.to_path_buf() };

        let mut seen: HashMap<PathBuf, &str> = HashMap::new();
        for name in dimensions.names() {
            if let Some(other) = seen.insert(store.records_path(name), name.as_str()) {
                bail!(
                    "Dimensions \"{other}\" and \"{name}\" would share {}",
                    store.records_path(name).display()
                );
            }
        }
        Ok(store)
    }

    pub fn counts_path(&self) -> PathBuf {
        self.dir.join(COUNTS_FILE)
    }

    pub fn records_path(&self, dimension_name: &str) -> PathBuf {
        let safe: String = dimension_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}_results.csv"))
    }

    /// Read the counts table. A missing file is an empty table.
    pub fn load_counts(&self, dimensions: &Dimensions) -> Result<CoverageTable> {
        let mut counts = CoverageTable::new(dimensions.len());
        let path = self.counts_path();
        let Some(content) = read_if_exists(&path)? else {
            return Ok(counts);
        };

        for (line_no, line) in content.lines().enumerate().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            let fields = parse_csv_line(line);
            let [item, dimension, count] = fields.as_slice() else {
                bail!("{}:{}: expected 3 columns, found {}", path.display(), line_no + 1, fields.len());
            };
            let count: u32 = count
                .trim()
                .parse()
                .with_context(|| format!("{}:{}: invalid count \"{count}\"", path.display(), line_no + 1))?;
            match dimensions.index_of(dimension) {
                Some(index) => counts.set(item, index, count)?,
                None => tracing::warn!(dimension = %dimension, "ignoring counts for unconfigured dimension"),
            }
        }
        Ok(counts)
    }

    /// Read every dimension's results table, in dimension order.
    pub fn load_records(&self, dimensions: &Dimensions) -> Result<Vec<ComparisonRecord>> {
        let mut records = Vec::new();
        for (index, name) in dimensions.names().iter().enumerate() {
            let path = self.records_path(name);
            let Some(content) = read_if_exists(&path)? else {
                continue;
            };
            for (line_no, line) in content.lines().enumerate().skip(1) {
                if line.trim().is_empty() {
                    continue;
                }
                let record = parse_record(line, index, records.len() as u64)
                    .with_context(|| format!("{}:{}", path.display(), line_no + 1))?;
                records.push(record);
            }
        }
        Ok(records)
    }

    pub fn write_summary(&self, summary: &Summary) -> Result<PathBuf> {
        let path = self.dir.join(SUMMARY_FILE);
        let json = serde_json::to_string_pretty(summary)?;
        std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

impl PersistentStore for FlatFileStore {
    fn append_record(&mut self, dimension_name: &str, record: &ComparisonRecord) -> Result<(), PersistenceError> {
        let path = self.records_path(dimension_name);
        let is_new = !path.exists();
        let io_err = |e: std::io::Error| PersistenceError::io(format!("Failed to append to {}", path.display()), e);

        let file = OpenOptions::new().create(true).append(true).open(&path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        if is_new {
            writeln!(writer, "{RECORDS_HEADER}").map_err(io_err)?;
        }
        let row = csv_row(&[
            record.subject.as_deref().unwrap_or(""),
            record.left.as_str(),
            record.right.as_str(),
            record.outcome.as_str(),
            &record.left_skill.to_string(),
            &record.right_skill.to_string(),
        ]);
        writeln!(writer, "{row}").map_err(io_err)?;
        writer.flush().map_err(io_err)
    }

    fn write_counts(&mut self, dimensions: &Dimensions, counts: &CoverageTable) -> Result<(), PersistenceError> {
        let path = self.counts_path();
        let tmp = path.with_extension("csv.tmp");
        let io_err = |e: std::io::Error| PersistenceError::io(format!("Failed to write {}", path.display()), e);

        {
            let file = std::fs::File::create(&tmp).map_err(io_err)?;
            let mut writer = BufWriter::new(file);
            writeln!(writer, "{COUNTS_HEADER}").map_err(io_err)?;
            for (item, dimension, count) in counts.rows() {
                let name = dimensions
                    .name(dimension)
                    .map_err(|e| PersistenceError::new(e.to_string()))?;
                writeln!(writer, "{}", csv_row(&[item.as_str(), name, &count.to_string()])).map_err(io_err)?;
            }
            writer.flush().map_err(io_err)?;
        }
        std::fs::rename(&tmp, &path).map_err(io_err)
    }
}

fn read_if_exists(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

fn parse_record(line: &str, dimension: usize, sequence: u64) -> Result<ComparisonRecord> {
    let fields = parse_csv_line(line);
    let [subject, left, right, outcome, left_skill, right_skill] = fields.as_slice() else {
        bail!("expected 6 columns, found {}", fields.len());
    };
    Ok(ComparisonRecord {
        sequence,
        dimension,
        left: left.clone(),
        right: right.clone(),
        outcome: outcome.parse::<Outcome>()?,
        left_skill: parse_skill_or_prior(left_skill),
        right_skill: parse_skill_or_prior(right_skill),
        subject: if subject.trim().is_empty() { None } else { Some(subject.clone()) },
    })
}

/// Parse the `mean±uncertainty` rendering back into a skill.
fn parse_skill(text: &str) -> Option<Skill> {
    let (mean, uncertainty) = text.split_once('±')?;
    Some(Skill::new(mean.trim().parse().ok()?, uncertainty.trim().parse().ok()?))
}

/// Stored ratings are informational; replay recomputes them. A malformed one
/// is logged and read as the prior.
fn parse_skill_or_prior(text: &str) -> Skill {
    parse_skill(text).unwrap_or_else(|| {
        tracing::warn!(value = %text, "malformed rating column, using prior");
        Skill::default()
    })
}

/// Load a pair schedule: header row, then `left,right[,...]` per line.
pub fn read_pairs_file(path: &Path) -> Result<Vec<Pair>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pairs file {}", path.display()))?;
    let mut pairs = Vec::new();
    for line in content.lines().skip(1) {
        let fields = parse_csv_line(line);
        if fields.len() >= 2 {
            let (left, right) = (fields[0].trim(), fields[1].trim());
            if !left.is_empty() && !right.is_empty() {
                pairs.push((left.to_string(), right.to_string()));
            }
        }
    }
    Ok(pairs)
}

/// Join fields into one CSV line, quoting where needed.
fn csv_row(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|f| {
            if f.contains([',', '"', '\n', '\r']) {
                format!("\"{}\"", f.replace('"', "\"\""))
            } else {
                f.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Split one CSV line, honouring double-quoted fields.
fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            ('"', _) => in_quotes = !in_quotes,
            (',', false) => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}
