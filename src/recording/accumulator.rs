use std::collections::BTreeMap;

use crate::models::ActionRecord;
use crate::page_object::synthesizer::{add_to_groups, PageGroup};

/// Running page-key grouping of the action log, updated as records are
/// appended so the synthesizer does not regroup at stop time
#[derive(Debug, Default)]
pub struct PageAccumulator {
    groups: BTreeMap<String, PageGroup>,
}

impl PageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: &ActionRecord) {
        add_to_groups(&mut self.groups, record.clone());
    }

    pub fn into_groups(self) -> BTreeMap<String, PageGroup> {
        self.groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_variants_share_a_page() {
        let mut acc = PageAccumulator::new();
        acc.record(&ActionRecord::navigation(0, "http://localhost/login"));
        acc.record(&ActionRecord::navigation(10, "http://localhost/login?x=1"));
        acc.record(&ActionRecord::navigation(20, "http://localhost/"));
        let groups = acc.into_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["LoginPage"].records.len(), 2);
        assert_eq!(groups["LoginPage"].url, "http://localhost/login");
    }
}
