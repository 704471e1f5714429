use datagrid_core::binding::{ordering_pairs, OrderClause, DEFAULT_PAGE, PAGE_PARAM};

/// Client-side copy of a grid's filter form: field values in form order, the
/// hidden page field and the current ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterForm {
    fields: Vec<(String, String)>,
    page: u32,
    ordering: Vec<OrderClause>,
}

impl Default for FilterForm {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            page: DEFAULT_PAGE,
            ordering: Vec::new(),
        }
    }
}

impl FilterForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Form with one empty value per declared field.
    pub fn with_fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: names.into_iter().map(|n| (n.into(), String::new())).collect(),
            ..Self::default()
        }
    }

    /// Set a field value; unknown fields are appended.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn clear(&mut self) {
        for (_, value) in &mut self.fields {
            value.clear();
        }
        self.ordering.clear();
        self.page = DEFAULT_PAGE;
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    pub fn ordering(&self) -> &[OrderClause] {
        &self.ordering
    }

    pub fn set_ordering(&mut self, ordering: Vec<OrderClause>) {
        self.ordering = ordering;
    }

    /// Every parameter the form submits: fields, `_page`, then ordering clauses.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.fields.clone();
        pairs.push((PAGE_PARAM.to_string(), self.page.to_string()));
        pairs.extend(ordering_pairs(&self.ordering));
        pairs
    }

    pub fn to_query(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.to_pairs())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datagrid_core::GridRequest;

    #[test]
    fn pairs_carry_fields_page_and_ordering() {
        let mut form = FilterForm::with_fields(["name", "region"]);
        form.set("name", "Gare du Nord");
        form.set_page(3);
        form.set_ordering(vec![OrderClause::desc("name")]);
        assert_eq!(
            form.to_query(),
            "name=Gare+du+Nord&region=&_page=3\
             &_datagrid_ordering%5B0%5D%5Bfield%5D=name\
             &_datagrid_ordering%5B0%5D%5Bdirection%5D=desc"
        );
        let request = GridRequest::from_query(&form.to_query());
        assert_eq!(request.get("name"), Some("Gare du Nord"));
        assert_eq!(request.get("_page"), Some("3"));
    }

    #[test]
    fn clear_resets_values_page_and_ordering() {
        let mut form = FilterForm::with_fields(["name"]);
        form.set("name", "x");
        form.set_page(0);
        assert_eq!(form.page(), 1);
        form.set_page(4);
        form.set_ordering(vec![OrderClause::asc("id")]);
        form.clear();
        assert_eq!(form.get("name"), Some(""));
        assert_eq!(form.page(), 1);
        assert!(form.ordering().is_empty());
    }
}
