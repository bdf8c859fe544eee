//! Node-graph layout for the dashboard canvas.
//!
//! Builds the course -> source -> item hierarchy as nodes and edges with 2D
//! positions. Placement is an explicit grid: courses are columns, sources
//! stack beneath their course, items fill a two-per-row grid beneath their
//! source. Each course column is as wide as its widest item row, so sibling
//! rectangles never collide for well-formed input; if a computed rectangle
//! still lands on an occupied one, a deterministic offset drawn from the
//! seeded RNG resolves the tie.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{course, item, source};

const COURSE_WIDTH: f64 = 250.0;
const SOURCE_WIDTH: f64 = 200.0;
const ITEM_WIDTH: f64 = 220.0;
const HORIZONTAL_SPACING: f64 = 120.0;
const VERTICAL_SPACING: f64 = 200.0;
const ITEM_VERTICAL_SPACING: f64 = 250.0;
const ITEM_COLUMN_GAP: f64 = 50.0;
const ITEMS_PER_ROW: usize = 2;

/// Seed used by the graph endpoint. Layout only varies with the seed when
/// the collision fallback fires.
pub const DEFAULT_LAYOUT_SEED: u64 = 0;

/// 2D canvas position of a node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct GraphPosition {
    pub x: f64,
    pub y: f64,
}

/// Fields the client renders inside a node. Which fields are present
/// depends on the node kind.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GraphNodeData {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<f64>,
}

/// One positioned node on the canvas
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub position: GraphPosition,
    pub data: GraphNodeData,
}

/// One parent-to-child edge
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: String,
}

/// Full graph payload returned by the graph endpoint
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, Copy)]
struct Rect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl Rect {
    fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// Builds the positioned graph for one user's data.
///
/// Input slices are placed in the order given; callers pass courses ordered
/// by creation time and items by due date (nulls last). Sources not
/// belonging to a listed course and items without a listed source are left
/// out, so the edge count always equals placed sources + placed items.
pub fn build_graph(
    courses: &[course::Model],
    sources: &[source::Model],
    items: &[item::Model],
    seed: u64,
) -> GraphData {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut occupied: Vec<Rect> = Vec::new();
    let mut graph = GraphData::default();

    let mut course_x = 0.0;

    for course in courses {
        let course_sources: Vec<&source::Model> =
            sources.iter().filter(|s| s.course_id == course.id).collect();

        let course_node_id = format!("course-{}", course.id);
        let position = place_rect(
            &mut occupied,
            Rect {
                x: course_x,
                y: 0.0,
                width: COURSE_WIDTH,
                height: VERTICAL_SPACING,
            },
            &mut rng,
        );
        graph.nodes.push(GraphNode {
            id: course_node_id.clone(),
            node_type: "course".to_string(),
            position,
            data: GraphNodeData {
                label: course.title.clone(),
                title: Some(course.title.clone()),
                code: course.code.clone(),
                instructor: course.instructor.clone(),
                color: course.color.clone(),
                ..Default::default()
            },
        });

        let mut current_y = VERTICAL_SPACING;
        let mut widest_row = COURSE_WIDTH;

        for source in &course_sources {
            let source_node_id = format!("source-{}", source.id);
            let position = place_rect(
                &mut occupied,
                Rect {
                    x: course_x,
                    y: current_y,
                    width: SOURCE_WIDTH,
                    height: VERTICAL_SPACING,
                },
                &mut rng,
            );
            graph.nodes.push(GraphNode {
                id: source_node_id.clone(),
                node_type: "source".to_string(),
                position,
                data: GraphNodeData {
                    label: source
                        .display_name
                        .clone()
                        .unwrap_or_else(|| source.provider.clone()),
                    provider: Some(source.provider.clone()),
                    status: Some(source.status.clone()),
                    ..Default::default()
                },
            });
            graph.edges.push(edge(&course_node_id, &source_node_id));

            current_y += VERTICAL_SPACING;

            let source_items: Vec<&item::Model> = items
                .iter()
                .filter(|i| i.source_id == Some(source.id))
                .collect();

            for (index, item) in source_items.iter().enumerate() {
                let row = index / ITEMS_PER_ROW;
                let col = index % ITEMS_PER_ROW;
                let x = course_x + col as f64 * (ITEM_WIDTH + ITEM_COLUMN_GAP);
                let y = current_y + row as f64 * ITEM_VERTICAL_SPACING;

                let row_width = (col + 1) as f64 * (ITEM_WIDTH + ITEM_COLUMN_GAP) - ITEM_COLUMN_GAP;
                widest_row = widest_row.max(row_width);

                let item_node_id = format!("item-{}", item.id);
                let position = place_rect(
                    &mut occupied,
                    Rect {
                        x,
                        y,
                        width: ITEM_WIDTH,
                        height: ITEM_VERTICAL_SPACING,
                    },
                    &mut rng,
                );
                graph.nodes.push(GraphNode {
                    id: item_node_id.clone(),
                    node_type: "item".to_string(),
                    position,
                    data: GraphNodeData {
                        label: item.title.clone(),
                        title: Some(item.title.clone()),
                        item_type: Some(item.item_type.clone()),
                        status: Some(item.status.clone()),
                        due_at: item.due_at.map(|due| due.to_rfc3339()),
                        points: item.points_possible,
                        ..Default::default()
                    },
                });
                graph.edges.push(edge(&source_node_id, &item_node_id));
            }

            let item_rows = source_items.len().div_ceil(ITEMS_PER_ROW);
            current_y += item_rows as f64 * ITEM_VERTICAL_SPACING + VERTICAL_SPACING;
        }

        course_x += widest_row + HORIZONTAL_SPACING;
    }

    graph
}

fn edge(source_id: &str, target_id: &str) -> GraphEdge {
    GraphEdge {
        id: format!("edge-{}-{}", source_id, target_id),
        source: source_id.to_string(),
        target: target_id.to_string(),
        edge_type: "smoothstep".to_string(),
    }
}

/// Claims a free position for the rectangle.
///
/// Grid placement keeps well-formed input collision-free; when a rectangle
/// still lands on an occupied one, it shifts right by offsets drawn from
/// the seeded RNG until clear, so the resolved layout is a pure function of
/// input plus seed.
fn place_rect(occupied: &mut Vec<Rect>, mut rect: Rect, rng: &mut StdRng) -> GraphPosition {
    while occupied.iter().any(|other| rect.intersects(other)) {
        rect.x += rng.gen_range(1.0..=HORIZONTAL_SPACING);
    }

    let position = GraphPosition {
        x: rect.x,
        y: rect.y,
    };
    occupied.push(rect);
    position
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sea_orm::prelude::DateTimeWithTimeZone;
    use uuid::Uuid;

    fn ts(day: u32) -> DateTimeWithTimeZone {
        Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap().into()
    }

    fn make_course(owner: Uuid, title: &str, day: u32) -> course::Model {
        course::Model {
            id: Uuid::new_v4(),
            owner_id: owner,
            title: title.to_string(),
            code: Some("CS 101".to_string()),
            term: None,
            instructor: None,
            color: None,
            external_id: None,
            external_source: None,
            external_url: None,
            metadata: None,
            created_at: ts(day),
            updated_at: ts(day),
        }
    }

    fn make_source(owner: Uuid, course_id: Uuid, provider: &str) -> source::Model {
        source::Model {
            id: Uuid::new_v4(),
            owner_id: owner,
            course_id,
            provider: provider.to_string(),
            display_name: Some(format!("{} connection", provider)),
            external_course_id: None,
            status: "active".to_string(),
            created_at: ts(1),
            updated_at: ts(1),
        }
    }

    fn make_item(owner: Uuid, course_id: Uuid, source_id: Uuid, title: &str) -> item::Model {
        item::Model {
            id: Uuid::new_v4(),
            owner_id: owner,
            course_id: Some(course_id),
            source_id: Some(source_id),
            title: title.to_string(),
            description: None,
            item_type: "assignment".to_string(),
            status: "pending".to_string(),
            due_at: Some(ts(10)),
            points_possible: Some(100.0),
            external_id: None,
            external_source: None,
            external_url: None,
            raw_ref: None,
            metadata: None,
            created_at: ts(1),
            updated_at: ts(1),
        }
    }

    #[test]
    fn test_empty_input_builds_empty_graph() {
        let graph = build_graph(&[], &[], &[], 7);
        assert!(graph.nodes.is_empty());
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_edge_count_equals_sources_plus_items() {
        let owner = Uuid::new_v4();
        let course_a = make_course(owner, "Algorithms", 1);
        let course_b = make_course(owner, "Databases", 2);
        let source_a = make_source(owner, course_a.id, "canvas");
        let source_b = make_source(owner, course_b.id, "prairielearn");

        let items = vec![
            make_item(owner, course_a.id, source_a.id, "HW 1"),
            make_item(owner, course_a.id, source_a.id, "HW 2"),
            make_item(owner, course_b.id, source_b.id, "Quiz 1"),
        ];

        let graph = build_graph(
            &[course_a, course_b],
            &[source_a, source_b],
            &items,
            DEFAULT_LAYOUT_SEED,
        );

        assert_eq!(graph.nodes.len(), 2 + 2 + 3);
        assert_eq!(graph.edges.len(), 2 + 3);
    }

    #[test]
    fn test_node_and_edge_id_formats() {
        let owner = Uuid::new_v4();
        let course = make_course(owner, "Algorithms", 1);
        let source = make_source(owner, course.id, "canvas");
        let item = make_item(owner, course.id, source.id, "HW 1");

        let course_id = course.id;
        let source_id = source.id;
        let item_id = item.id;

        let graph = build_graph(&[course], &[source], &[item], DEFAULT_LAYOUT_SEED);

        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert!(ids.contains(&format!("course-{}", course_id).as_str()));
        assert!(ids.contains(&format!("source-{}", source_id).as_str()));
        assert!(ids.contains(&format!("item-{}", item_id).as_str()));

        let expected_edge = format!("edge-source-{}-item-{}", source_id, item_id);
        assert!(graph.edges.iter().any(|e| e.id == expected_edge));
        assert!(graph.edges.iter().all(|e| e.edge_type == "smoothstep"));
    }

    #[test]
    fn test_items_fill_two_per_row_grid() {
        let owner = Uuid::new_v4();
        let course = make_course(owner, "Algorithms", 1);
        let source = make_source(owner, course.id, "canvas");
        let items = vec![
            make_item(owner, course.id, source.id, "HW 1"),
            make_item(owner, course.id, source.id, "HW 2"),
            make_item(owner, course.id, source.id, "HW 3"),
        ];

        let graph = build_graph(&[course], &[source], &items, DEFAULT_LAYOUT_SEED);

        let item_positions: Vec<GraphPosition> = graph
            .nodes
            .iter()
            .filter(|n| n.node_type == "item")
            .map(|n| n.position)
            .collect();

        // First row: two columns. Second row: back to column zero.
        assert_eq!(item_positions[0], GraphPosition { x: 0.0, y: 400.0 });
        assert_eq!(item_positions[1], GraphPosition { x: 270.0, y: 400.0 });
        assert_eq!(item_positions[2], GraphPosition { x: 0.0, y: 650.0 });
    }

    #[test]
    fn test_adjacent_course_columns_clear_the_item_grid() {
        let owner = Uuid::new_v4();
        let course_a = make_course(owner, "Algorithms", 1);
        let course_b = make_course(owner, "Databases", 2);
        let source_a = make_source(owner, course_a.id, "canvas");
        let source_b = make_source(owner, course_b.id, "canvas");
        let items = vec![
            make_item(owner, course_a.id, source_a.id, "HW 1"),
            make_item(owner, course_a.id, source_a.id, "HW 2"),
            make_item(owner, course_b.id, source_b.id, "HW 1"),
            make_item(owner, course_b.id, source_b.id, "HW 2"),
        ];

        let graph = build_graph(
            &[course_a, course_b],
            &[source_a, source_b],
            &items,
            DEFAULT_LAYOUT_SEED,
        );

        // First column carries a 490-wide item row, so the second course
        // starts past it rather than at the bare course pitch.
        let course_xs: Vec<f64> = graph
            .nodes
            .iter()
            .filter(|n| n.node_type == "course")
            .map(|n| n.position.x)
            .collect();
        assert_eq!(course_xs, vec![0.0, 610.0]);
    }

    #[test]
    fn test_layout_is_deterministic_for_fixed_seed() {
        let owner = Uuid::new_v4();
        let course = make_course(owner, "Algorithms", 1);
        let source = make_source(owner, course.id, "canvas");
        let items = vec![
            make_item(owner, course.id, source.id, "HW 1"),
            make_item(owner, course.id, source.id, "HW 2"),
        ];

        let first = build_graph(
            std::slice::from_ref(&course),
            std::slice::from_ref(&source),
            &items,
            42,
        );
        let second = build_graph(&[course], &[source], &items, 42);

        let first_json = serde_json::to_value(&first).unwrap();
        let second_json = serde_json::to_value(&second).unwrap();
        assert_eq!(first_json, second_json);
    }

    #[test]
    fn test_items_without_listed_source_are_left_out() {
        let owner = Uuid::new_v4();
        let course = make_course(owner, "Algorithms", 1);
        let source = make_source(owner, course.id, "canvas");

        let mut orphan = make_item(owner, course.id, source.id, "Orphan");
        orphan.source_id = None;

        let graph = build_graph(&[course], &[source], &[orphan], DEFAULT_LAYOUT_SEED);

        assert!(graph.nodes.iter().all(|n| n.node_type != "item"));
        assert_eq!(graph.edges.len(), 1);
    }

    #[test]
    fn test_collision_fallback_is_deterministic() {
        let rect = Rect {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
        };

        let run = |seed: u64| {
            let mut occupied = Vec::new();
            let mut rng = StdRng::seed_from_u64(seed);
            let first = place_rect(&mut occupied, rect, &mut rng);
            let second = place_rect(&mut occupied, rect, &mut rng);
            (first, second)
        };

        let (first_a, second_a) = run(9);
        let (first_b, second_b) = run(9);

        assert_eq!(first_a, first_b);
        assert_eq!(second_a, second_b);
        // The second identical rectangle must have been shifted clear.
        assert!(second_a.x >= first_a.x + 100.0);
    }

    #[test]
    fn test_source_node_carries_provider_and_status() {
        let owner = Uuid::new_v4();
        let course = make_course(owner, "Algorithms", 1);
        let mut source = make_source(owner, course.id, "canvas");
        source.display_name = None;

        let graph = build_graph(&[course], &[source], &[], DEFAULT_LAYOUT_SEED);

        let node = graph
            .nodes
            .iter()
            .find(|n| n.node_type == "source")
            .unwrap();
        assert_eq!(node.data.label, "canvas");
        assert_eq!(node.data.provider.as_deref(), Some("canvas"));
        assert_eq!(node.data.status.as_deref(), Some("active"));
    }
}
