use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// What was sighted. Wire values follow the client (`policja` / `kontrola`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ReportKind {
    #[serde(rename = "policja", alias = "policeCheckpoint")]
    PoliceCheckpoint,
    #[serde(rename = "kontrola", alias = "ticketInspection")]
    TicketInspection,
}

impl ReportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::PoliceCheckpoint => "policja",
            ReportKind::TicketInspection => "kontrola",
        }
    }
}

impl std::str::FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "policja" | "policeCheckpoint" => Ok(ReportKind::PoliceCheckpoint),
            "kontrola" | "ticketInspection" => Ok(ReportKind::TicketInspection),
            other => Err(format!("unknown report type {other:?}")),
        }
    }
}

/// A report as returned to callers, with its live confirmation count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub city: String,
    #[serde(rename = "type")]
    pub kind: ReportKind,
    pub location: String,
    pub bus_number: Option<String>,
    pub direction: Option<String>,
    pub lat: f64,
    pub lng: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub author_id: Option<Uuid>,
    pub confirmation_count: i64,
}

/// `reports` row joined with `count(confirmations)`.
#[derive(Debug, FromRow)]
pub struct ReportRow {
    pub id: Uuid,
    pub city: String,
    pub kind: String,
    pub location: String,
    pub bus_number: Option<String>,
    pub direction: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub created_at: OffsetDateTime,
    pub author_id: Option<Uuid>,
    pub confirmation_count: i64,
}

impl TryFrom<ReportRow> for Report {
    type Error = sqlx::Error;

    fn try_from(r: ReportRow) -> Result<Self, Self::Error> {
        let kind = r
            .kind
            .parse::<ReportKind>()
            .map_err(|e| sqlx::Error::Decode(e.into()))?;
        Ok(Self {
            id: r.id,
            city: r.city,
            kind,
            location: r.location,
            bus_number: r.bus_number,
            direction: r.direction,
            lat: r.lat,
            lng: r.lng,
            created_at: r.created_at,
            author_id: r.author_id,
            confirmation_count: r.confirmation_count,
        })
    }
}

/// A validated report ready for insertion. `city` and `author_id` come from
/// the authenticated caller, never from the request body.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub id: Uuid,
    pub city: String,
    pub kind: ReportKind,
    pub location: String,
    pub bus_number: Option<String>,
    pub direction: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub created_at: OffsetDateTime,
    pub author_id: Uuid,
}

impl NewReport {
    pub fn into_report(self) -> Report {
        Report {
            id: self.id,
            city: self.city,
            kind: self.kind,
            location: self.location,
            bus_number: self.bus_number,
            direction: self.direction,
            lat: self.lat,
            lng: self.lng,
            created_at: self.created_at,
            author_id: Some(self.author_id),
            confirmation_count: 0,
        }
    }
}

/// Outcome of a confirmation attempt as seen by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Confirmed { author_id: Option<Uuid> },
    AlreadyConfirmed,
    ReportMissing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_accepts_both_spellings() {
        let a: ReportKind = serde_json::from_str("\"policja\"").unwrap();
        let b: ReportKind = serde_json::from_str("\"ticketInspection\"").unwrap();
        assert_eq!(a, ReportKind::PoliceCheckpoint);
        assert_eq!(b, ReportKind::TicketInspection);
        assert_eq!(serde_json::to_string(&b).unwrap(), "\"kontrola\"");
        assert!("bus".parse::<ReportKind>().is_err());
    }
}
