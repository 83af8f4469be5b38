// Weekly statistics endpoints.

use crate::client::PortalClient;
use crate::error::Error;
use crate::model::{Envelope, WeeklyStatistics};

impl PortalClient {
    /// Fetch the current-week grade/ranking statistics for a student.
    pub async fn student_weekly(&self, student_id: &str) -> Result<WeeklyStatistics, Error> {
        let path = format!("/api/statistics/weekly/current/{student_id}");
        let envelope: Envelope<WeeklyStatistics> = self.get(&path).await?;
        Ok(envelope.data)
    }
}
