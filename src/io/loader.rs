use crate::error::LoadError;
use crate::kernel::{Priority, ProcessRecord};

const FIELDS: [&str; 8] = [
    "arrival_tick",
    "priority",
    "cpu_ticks",
    "memory_blocks",
    "printer",
    "scanner",
    "modem",
    "disk_blocks",
];

/// Parses process description lines of the form
/// `arrival, priority, cpu, memory, printer, scanner, modem, disk`.
///
/// Blank lines and lines starting with `#` are skipped.
pub fn parse_records(text: &str) -> Result<Vec<ProcessRecord>, LoadError> {
    let mut records = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        records.push(parse_record(idx + 1, line)?);
    }

    Ok(records)
}

fn parse_record(line_num: usize, line: &str) -> Result<ProcessRecord, LoadError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != FIELDS.len() {
        return Err(LoadError::FieldCount {
            line: line_num,
            found: fields.len(),
        });
    }

    let mut values = [0u64; 8];
    for (i, field) in fields.iter().enumerate() {
        values[i] = field.parse().map_err(|_| LoadError::InvalidNumber {
            line: line_num,
            field: FIELDS[i],
            value: field.to_string(),
        })?;
    }

    let out_of_range = |i: usize| LoadError::OutOfRange {
        line: line_num,
        field: FIELDS[i],
        value: values[i],
    };

    let priority = u8::try_from(values[1])
        .ok()
        .and_then(Priority::new)
        .ok_or_else(|| out_of_range(1))?;
    let cpu_ticks = u32::try_from(values[2])
        .ok()
        .filter(|ticks| *ticks > 0)
        .ok_or_else(|| out_of_range(2))?;
    let memory_blocks = usize::try_from(values[3]).map_err(|_| out_of_range(3))?;
    let disk_blocks = usize::try_from(values[7]).map_err(|_| out_of_range(7))?;

    let flag = |i: usize| match values[i] {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(out_of_range(i)),
    };

    Ok(ProcessRecord {
        arrival_tick: values[0],
        priority,
        cpu_ticks,
        memory_blocks,
        printer: flag(4)?,
        scanner: flag(5)?,
        modem: flag(6)?,
        disk_blocks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loader_parses_lines_in_order() {
        let records = parse_records("0, 0, 3, 64, 0, 0, 0, 0\n\n2,3,6,128,1,0,1,2\n").unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].priority, Priority::REALTIME);
        assert_eq!(records[0].memory_blocks, 64);
        assert_eq!(
            records[1],
            ProcessRecord {
                arrival_tick: 2,
                priority: Priority::USER,
                cpu_ticks: 6,
                memory_blocks: 128,
                printer: true,
                scanner: false,
                modem: true,
                disk_blocks: 2,
            }
        );
    }

    #[test]
    fn test_loader_skips_comments() {
        let records = parse_records("# arrival,priority,...\n1,1,1,1,0,0,0,0").unwrap();

        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_loader_wrong_field_count() {
        assert_eq!(
            parse_records("0,0,1,1,0,0,0,0\n0,1,2").unwrap_err(),
            LoadError::FieldCount { line: 2, found: 3 }
        );
    }

    #[test]
    fn test_loader_not_a_number() {
        assert_eq!(
            parse_records("0,x,1,1,0,0,0,0").unwrap_err(),
            LoadError::InvalidNumber { line: 1, field: "priority", value: "x".to_string() }
        );
    }

    #[test]
    fn test_loader_range_checks() {
        let cases = [
            ("0,4,1,1,0,0,0,0", "priority", 4),
            ("0,1,0,1,0,0,0,0", "cpu_ticks", 0),
            ("0,1,1,1,2,0,0,0", "printer", 2),
            ("0,1,1,1,0,0,7,0", "modem", 7),
        ];

        for (line, field, value) in cases {
            assert_eq!(
                parse_records(line).unwrap_err(),
                LoadError::OutOfRange { line: 1, field, value }
            );
        }
    }
}
