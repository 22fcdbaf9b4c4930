//! Interactive fallbacks for `run --interactive`: choosing columns the
//! resolver could not find, and typing a date label.

use std::io::{BufRead, Write};

use anyhow::{anyhow, bail, Result};
use radar_chart::dates::normalize_override;
use radar_chart::{FieldKey, PartialMapping};

fn read_answer<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Ask for a column for every required field. Enter keeps the suggestion,
/// a number or exact header picks a column, `q` cancels.
pub fn prompt_mapping<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    columns: &[String],
    suggested: &PartialMapping,
) -> Result<PartialMapping> {
    writeln!(output, "Select the correct CSV column for each required field.")?;
    for (idx, column) in columns.iter().enumerate() {
        writeln!(output, "  [{}] {}", idx + 1, column)?;
    }

    let mut mapping = PartialMapping::new();
    for field in FieldKey::REQUIRED {
        let current = suggested.get(&field);
        loop {
            match current {
                Some(column) => write!(output, "{} [{}]: ", field.title(), column)?,
                None => write!(output, "{}: ", field.title())?,
            }
            output.flush()?;

            let answer = read_answer(input)?
                .ok_or_else(|| anyhow!("Column mapping was cancelled."))?;
            if answer.eq_ignore_ascii_case("q") {
                bail!("Column mapping was cancelled.");
            }
            let chosen = if answer.is_empty() {
                current.cloned()
            } else if let Ok(number) = answer.parse::<usize>() {
                number
                    .checked_sub(1)
                    .and_then(|idx| columns.get(idx))
                    .cloned()
            } else {
                columns.iter().find(|c| c.trim() == answer).cloned()
            };
            match chosen {
                Some(column) => {
                    mapping.insert(field, column);
                    break;
                }
                None => writeln!(output, "Please choose a column for every field.")?,
            }
        }
    }
    Ok(mapping)
}

/// Ask for a date label; parseable input is normalised, anything else kept.
pub fn prompt_date_label<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    file_name: &str,
) -> Result<String> {
    write!(
        output,
        "Enter a date label for {file_name} (e.g. 2026-01-31): "
    )?;
    output.flush()?;
    read_answer(input)?
        .as_deref()
        .and_then(normalize_override)
        .ok_or_else(|| anyhow!("No date label resolved for {file_name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use radar_chart::MetricKey;
    use std::io::Cursor;

    fn columns() -> Vec<String> {
        ["Who", "JH", "PP", "RSI", "EPP", "EDR"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn keeps_suggestions_and_accepts_numbers_or_names() {
        let mut suggested = PartialMapping::new();
        suggested.insert(FieldKey::AthleteName, "Who".into());
        let mut input = Cursor::new("\n2\n7\nPP\n4\nEPP\n6\n");
        let mut output = Vec::new();
        let mapping = prompt_mapping(&mut input, &mut output, &columns(), &suggested).unwrap();

        assert_eq!(mapping.len(), FieldKey::REQUIRED.len());
        assert_eq!(mapping[&FieldKey::AthleteName], "Who");
        assert_eq!(mapping[&FieldKey::Metric(MetricKey::JumpHeight)], "JH");
        assert_eq!(mapping[&FieldKey::Metric(MetricKey::PeakPowerBm)], "PP");
        assert_eq!(mapping[&FieldKey::Metric(MetricKey::EccDecRfdBm)], "EDR");
        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("Athlete Name [Who]: "));
        assert!(shown.contains("Please choose a column"));
    }

    #[test]
    fn quitting_or_eof_cancels() {
        let suggested = PartialMapping::new();
        let err = prompt_mapping(&mut Cursor::new("q\n"), &mut Vec::new(), &columns(), &suggested)
            .unwrap_err();
        assert_eq!(err.to_string(), "Column mapping was cancelled.");
        assert!(prompt_mapping(&mut Cursor::new(""), &mut Vec::new(), &columns(), &suggested)
            .is_err());
    }

    #[test]
    fn date_prompt_normalises() {
        let label = prompt_date_label(&mut Cursor::new("Jan 31, 2026\n"), &mut Vec::new(), "a.csv")
            .unwrap();
        assert_eq!(label, "2026-01-31");
        let label =
            prompt_date_label(&mut Cursor::new("Week 3\n"), &mut Vec::new(), "a.csv").unwrap();
        assert_eq!(label, "Week 3");
        assert!(prompt_date_label(&mut Cursor::new("\n"), &mut Vec::new(), "a.csv").is_err());
    }
}
