use crate::domain::item::{Item, Lane};
use std::cmp::Ordering;
use std::str::FromStr;

/// Fields available for sorting items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Position,
    Lane,
    Created,
    Updated,
    Client,
    Price,
}

/// Sort order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "position" => Ok(SortField::Position),
            "lane" | "status" => Ok(SortField::Lane),
            "created" => Ok(SortField::Created),
            "updated" => Ok(SortField::Updated),
            "client" => Ok(SortField::Client),
            "price" => Ok(SortField::Price),
            _ => Err(format!(
                "Invalid sort field '{}'. Valid fields: position, lane, created, updated, client, price",
                s
            )),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Ascending),
            "desc" => Ok(SortOrder::Descending),
            _ => Err(format!(
                "Invalid sort order '{}'. Valid orders: asc, desc",
                s
            )),
        }
    }
}

/// Sorts items in-place by the given field and direction
///
/// Position sorting groups by lane first so a mixed list renders lane by lane,
/// with creation time breaking ties.
///
/// # Examples
/// ```
/// use orderboard_core::domain::item::{Item, Lane, OrderDetails};
/// use orderboard_core::domain::sorting::{sort_items, SortField, SortOrder};
///
/// let mut items = vec![
///     Item::new(Lane::New, 2, OrderDetails::new("C", "c")),
///     Item::new(Lane::New, 0, OrderDetails::new("A", "a")),
/// ];
///
/// sort_items(&mut items, SortField::Position, SortOrder::Ascending);
/// assert_eq!(items[0].position, 0);
/// ```
pub fn sort_items(items: &mut [Item], field: SortField, order: SortOrder) {
    items.sort_by(|a, b| {
        let cmp = match field {
            SortField::Position => compare_lane(&a.lane, &b.lane)
                .then(a.position.cmp(&b.position))
                .then(a.created_at.cmp(&b.created_at)),
            SortField::Lane => compare_lane(&a.lane, &b.lane),
            SortField::Created => a.created_at.cmp(&b.created_at),
            SortField::Updated => a.updated_at.cmp(&b.updated_at),
            SortField::Client => a
                .details
                .client_name
                .to_lowercase()
                .cmp(&b.details.client_name.to_lowercase()),
            SortField::Price => a
                .details
                .price
                .partial_cmp(&b.details.price)
                .unwrap_or(Ordering::Equal),
        };

        match order {
            SortOrder::Ascending => cmp,
            SortOrder::Descending => cmp.reverse(),
        }
    });
}

/// Lanes compare by pipeline progression: New → InProgress → Completed
fn compare_lane(a: &Lane, b: &Lane) -> Ordering {
    fn lane_order(lane: &Lane) -> u8 {
        match lane {
            Lane::New => 0,
            Lane::InProgress => 1,
            Lane::Completed => 2,
        }
    }
    lane_order(a).cmp(&lane_order(b))
}
