use crate::record::{BomItem, SolutionRecord};

/// Generation number handed out when a solve starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SolveTicket(u64);

impl SolveTicket {
    pub fn generation(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    /// A newer solve was started after this ticket; the record was dropped.
    Stale,
}

/// Current result plus the session's history, most recent first.
///
/// `current` is an id into `history`, so a bill-of-materials merge is seen by both without
/// copying.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    history: Vec<SolutionRecord>,
    current: Option<String>,
    latest_ticket: u64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_solve(&mut self) -> SolveTicket {
        self.latest_ticket += 1;
        SolveTicket(self.latest_ticket)
    }

    /// `false` once a newer solve has begun.
    pub fn is_latest(&self, ticket: SolveTicket) -> bool {
        ticket.0 >= self.latest_ticket
    }

    pub fn record_solution(
        &mut self,
        ticket: SolveTicket,
        record: SolutionRecord,
    ) -> Result<RecordOutcome, String> {
        if !self.is_latest(ticket) {
            return Ok(RecordOutcome::Stale);
        }
        if self.get(&record.id).is_some() {
            return Err(format!("duplicate record id '{}'", record.id));
        }
        self.current = Some(record.id.clone());
        self.history.insert(0, record);
        Ok(RecordOutcome::Recorded)
    }

    /// Replaces the bill of materials of one record. Returns `false` when the id is unknown.
    pub fn merge_bill_of_materials(&mut self, id: &str, items: Vec<BomItem>) -> bool {
        match self.history.iter_mut().find(|record| record.id == id) {
            Some(record) => {
                record.bill_of_materials = Some(items);
                true
            }
            None => false,
        }
    }

    pub fn select(&mut self, id: &str) -> Option<&SolutionRecord> {
        let index = self.history.iter().position(|record| record.id == id)?;
        self.current = Some(id.to_string());
        self.history.get(index)
    }

    pub fn clear_current(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&SolutionRecord> {
        let id = self.current.as_deref()?;
        self.get(id)
    }

    pub fn get(&self, id: &str) -> Option<&SolutionRecord> {
        self.history.iter().find(|record| record.id == id)
    }

    pub fn history(&self) -> &[SolutionRecord] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{RecordOutcome, SessionStore};
    use crate::problem::{Domain, ProblemRequest};
    use crate::record::{BomItem, BomPriority, SolutionRecord, SolveResult};

    fn record(id: &str, query: &str) -> SolutionRecord {
        let result: SolveResult = serde_json::from_value(json!({
            "analysis": format!("analysis for {query}"),
            "steps": ["step"],
            "variables": {},
            "confidence": 0.5,
        }))
        .unwrap();
        SolutionRecord::new(
            id,
            &ProblemRequest::new(Domain::Mechanical, query),
            "dryrun-text-1",
            result,
        )
    }

    fn bom() -> Vec<BomItem> {
        vec![BomItem {
            item_name: "Bearing 6205-2RS".to_string(),
            specification: "25x52x15 mm".to_string(),
            quantity: "2".to_string(),
            priority: BomPriority::High,
        }]
    }

    #[test]
    fn history_is_most_recent_first_and_current_follows() -> Result<(), String> {
        let mut store = SessionStore::new();
        let ticket = store.begin_solve();
        store.record_solution(ticket, record("a", "A"))?;
        let ticket = store.begin_solve();
        store.record_solution(ticket, record("b", "B"))?;

        let ids: Vec<&str> = store.history().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(store.current().map(|r| r.id.as_str()), Some("b"));
        Ok(())
    }

    #[test]
    fn bom_merge_only_touches_the_keyed_record() -> Result<(), String> {
        let mut store = SessionStore::new();
        let ticket = store.begin_solve();
        store.record_solution(ticket, record("x", "X"))?;
        let ticket = store.begin_solve();
        store.record_solution(ticket, record("y", "Y"))?;
        let y_before = store.get("y").cloned();

        assert!(store.merge_bill_of_materials("x", bom()));

        assert_eq!(store.get("y").cloned(), y_before);
        assert_eq!(store.get("x").and_then(|r| r.bill_of_materials.clone()), Some(bom()));
        assert!(!store.merge_bill_of_materials("missing", bom()));
        Ok(())
    }

    #[test]
    fn bom_merge_is_visible_through_current() -> Result<(), String> {
        let mut store = SessionStore::new();
        let ticket = store.begin_solve();
        store.record_solution(ticket, record("x", "X"))?;
        store.merge_bill_of_materials("x", bom());
        assert_eq!(
            store.current().and_then(|r| r.bill_of_materials.clone()),
            Some(bom())
        );
        Ok(())
    }

    #[test]
    fn stale_ticket_does_not_overwrite_newer_result() -> Result<(), String> {
        let mut store = SessionStore::new();
        let older = store.begin_solve();
        let newer = store.begin_solve();
        assert!(!store.is_latest(older));
        assert!(store.is_latest(newer));
        assert_eq!(store.record_solution(newer, record("new", "N"))?, RecordOutcome::Recorded);
        assert_eq!(store.record_solution(older, record("old", "O"))?, RecordOutcome::Stale);
        assert_eq!(store.len(), 1);
        assert_eq!(store.current().map(|r| r.id.as_str()), Some("new"));
        Ok(())
    }

    #[test]
    fn duplicate_ids_are_rejected() -> Result<(), String> {
        let mut store = SessionStore::new();
        let ticket = store.begin_solve();
        store.record_solution(ticket, record("a", "A"))?;
        let ticket = store.begin_solve();
        let err = store.record_solution(ticket, record("a", "again")).unwrap_err();
        assert!(err.contains("duplicate record id 'a'"));
        assert_eq!(store.len(), 1);
        Ok(())
    }

    #[test]
    fn select_and_clear_move_the_current_pointer_only() -> Result<(), String> {
        let mut store = SessionStore::new();
        let ticket = store.begin_solve();
        store.record_solution(ticket, record("a", "A"))?;
        let ticket = store.begin_solve();
        store.record_solution(ticket, record("b", "B"))?;

        assert_eq!(store.select("a").map(|r| r.query.as_str()), Some("A"));
        assert_eq!(store.current().map(|r| r.id.as_str()), Some("a"));
        assert!(store.select("zzz").is_none());
        assert_eq!(store.current().map(|r| r.id.as_str()), Some("a"));

        store.clear_current();
        assert!(store.current().is_none());
        assert_eq!(store.len(), 2);
        Ok(())
    }
}
