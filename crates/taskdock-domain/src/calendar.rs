use chrono::NaiveDate;

/// Calendar-relative label for a due date, measured against `today`.
pub fn calendar_label(date: NaiveDate, today: NaiveDate) -> String {
    let days = (date - today).num_days();
    match days {
        0 => "Today".to_owned(),
        1 => "Tomorrow".to_owned(),
        -1 => "Yesterday".to_owned(),
        2..=6 => date.format("%A").to_string(),
        -6..=-2 => format!("❗️{} days ago", -days),
        _ => short_date(date),
    }
}

pub fn short_date(date: NaiveDate) -> String {
    date.format("%d/%m/%y").to_string()
}

/// Due dates arrive as `YYYYMMDD`; empty or malformed values carry no date.
pub fn parse_wire_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y%m%d").ok()
}

pub fn wire_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

const INPUT_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y%m%d"];

pub fn parse_input_date(raw: &str) -> Option<NaiveDate> {
    INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw.trim(), format).ok())
}
