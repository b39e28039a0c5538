use chrono::{DateTime, Utc};

use crate::domain::record::{RecordStatus, StoredRecord};

const HEADERS: [&str; 16] = [
    "id",
    "job_id",
    "name",
    "email",
    "phone",
    "country",
    "page_link",
    "website",
    "location",
    "address",
    "likes",
    "followers",
    "scrape_time",
    "scraped_at",
    "status",
    "error_message",
];

/// Spreadsheet dump: a header row, then one row per record in the order given.
pub fn records_to_csv(records: &[StoredRecord]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(HEADERS)?;

    for stored in records {
        let record = &stored.record;
        let status = match record.status {
            RecordStatus::Success => "success",
            RecordStatus::Failed => "failed",
        };
        writer.write_record([
            stored.id.to_string(),
            stored.job_id.to_string(),
            record.name.clone(),
            record.email.clone(),
            record.phone.clone(),
            record.country.clone(),
            record.page_link.clone(),
            record.website.clone(),
            record.location.clone(),
            record.address.clone(),
            record.likes.to_string(),
            record.followers.to_string(),
            record.scrape_time.to_string(),
            record.scraped_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            status.to_string(),
            record.error_message.clone().unwrap_or_default(),
        ])?;
    }

    writer.into_inner().map_err(|e| e.into_error().into())
}

pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("scraped_records_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use uuid::Uuid;

    use super::*;
    use crate::domain::{extractor::ContactDetails, record::ScrapedRecord};

    fn stored(id: i64, link: &str, name: &str) -> StoredRecord {
        let details = ContactDetails {
            email: "a@b.pk".to_string(),
            likes: 12,
            ..Default::default()
        };
        StoredRecord {
            id,
            job_id: Uuid::nil(),
            record: ScrapedRecord::from_contact_details(link, name, details),
        }
    }

    #[test]
    fn csv_has_header_and_rows_in_order() {
        let records = vec![stored(2, "https://f.com/b", "B, Inc"), stored(1, "https://f.com/a", "A")];
        let csv = String::from_utf8(records_to_csv(&records).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("id,job_id,name,email,phone"));
        assert!(lines[1].starts_with("2,"));
        assert!(lines[1].contains("\"B, Inc\""));
        assert!(lines[1].contains(",a@b.pk,"));
        assert!(lines[2].starts_with("1,"));
    }

    #[test]
    fn empty_export_is_just_the_header() {
        let csv = String::from_utf8(records_to_csv(&[]).unwrap()).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn filename_is_timestamped() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 8, 5, 9).unwrap();
        assert_eq!(export_filename(now), "scraped_records_20261019_080509.csv");
    }
}
