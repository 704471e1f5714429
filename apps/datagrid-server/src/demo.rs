//! Built-in station grid served out of the box.

use chrono::NaiveDate;
use datagrid_core::definition::{Choice, GridDefinition, Widget, WidgetOptions};
use datagrid_core::source::{MemoryPlan, MemorySource};
use datagrid_core::{grid_id_of, CellValue, DataGrid, FilterValue, GridError, GridRegistry, GridRow, LinkContext};
use serde::{Deserialize, Serialize};

pub const STATION_COUNT: u32 = 45;
pub const STATION_SHOW_ROUTE: &str = "station_show";

const REGIONS: [(&str, &str); 4] = [
    ("North", "north"),
    ("South", "south"),
    ("East", "east"),
    ("West", "west"),
];
const CITIES: [&str; 5] = ["Lille", "Marseille", "Strasbourg", "Brest", "Lyon"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: u32,
    pub name: String,
    pub city: String,
    pub region: String,
    pub capacity: i64,
    pub accessible: bool,
    pub opened_on: NaiveDate,
}

impl GridRow for Station {
    fn field(&self, name: &str) -> Option<CellValue> {
        match name {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.as_str().into()),
            "city" => Some(self.city.as_str().into()),
            "region" => Some(self.region.as_str().into()),
            "capacity" => Some(self.capacity.into()),
            "accessible" => Some(self.accessible.into()),
            "openedOn" => Some(self.opened_on.into()),
            _ => None,
        }
    }
}

/// Marker type naming the station grid.
pub struct StationGrid;

pub fn station_grid_id() -> String {
    grid_id_of::<StationGrid>()
}

/// Deterministic sample rows.
pub fn stations(count: u32) -> Vec<Station> {
    let epoch = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or_default();
    (1..=count)
        .map(|id| {
            let i = id as usize;
            Station {
                id,
                name: format!("Station {id:02}"),
                city: CITIES[i % CITIES.len()].to_string(),
                region: REGIONS[i % REGIONS.len()].1.to_string(),
                capacity: i64::from(id * 37 % 500),
                accessible: id % 3 != 0,
                opened_on: epoch + chrono::Duration::days(i64::from(id) * 811),
            }
        })
        .collect()
}

pub fn station_grid(rows: Vec<Station>) -> Result<DataGrid<MemorySource<Station>>, GridError> {
    let choices = REGIONS
        .iter()
        .map(|(label, value)| Choice::new(*label, *value))
        .collect();
    let definition = GridDefinition::<MemoryPlan<Station>, Station>::builder_for::<StationGrid>()
        .filter(
            "name",
            Widget::Text,
            WidgetOptions::default().label("Name").placeholder("Station 1"),
            |plan, value| match value.as_str() {
                Some(needle) => {
                    let needle = needle.to_lowercase();
                    plan.and_where(move |s: &Station| s.name.to_lowercase().contains(&needle))
                }
                None => plan,
            },
        )
        .filter(
            "region",
            Widget::Choice(choices),
            WidgetOptions::default().label("Region"),
            |plan, value| match value.as_str() {
                Some(region) => {
                    let region = region.to_string();
                    plan.and_where(move |s: &Station| s.region == region)
                }
                None => plan,
            },
        )
        .filter(
            "accessible",
            Widget::Checkbox,
            WidgetOptions::default().label("Step-free access only"),
            |plan, value| match value {
                FilterValue::Bool(true) => plan.and_where(|s: &Station| s.accessible),
                _ => plan,
            },
        )
        .filter(
            "openedAfter",
            Widget::Date,
            WidgetOptions::default().label("Opened after"),
            |plan, value| match value.as_date() {
                Some(date) => plan.and_where(move |s: &Station| s.opened_on > date),
                None => plan,
            },
        )
        .add_display_field("Name", "name")
        .add_display_field("City", "city")
        .add_display_field("Region", "region")
        .add_display_field("Capacity", "capacity")
        .add_display_field("Opened", "openedOn")
        .add_action_link("Show", |links: &LinkContext, s: &Station| {
            links.generate(STATION_SHOW_ROUTE, &[("id", &s.id.to_string())])
        })
        .build()?;
    let source = MemorySource::new(rows, ["id", "name", "city", "region", "capacity", "openedOn"]);
    Ok(DataGrid::new(definition, source))
}

pub fn register(registry: &mut GridRegistry) -> Result<(), GridError> {
    registry.register_type::<StationGrid, _, _>(|| station_grid(stations(STATION_COUNT)))
}

pub fn link_routes(links: LinkContext) -> LinkContext {
    links.with_route(STATION_SHOW_ROUTE, "/stations/{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_rows_are_stable() {
        let rows = stations(STATION_COUNT);
        assert_eq!(rows.len(), 45);
        assert_eq!(rows[0].name, "Station 01");
        assert_eq!(rows, stations(STATION_COUNT));
    }

    #[test]
    fn registers_under_the_type_id() {
        let mut registry = GridRegistry::new();
        register(&mut registry).unwrap();
        let grid = registry.resolve(&station_grid_id()).unwrap();
        assert_eq!(grid.id(), station_grid_id());
    }
}
