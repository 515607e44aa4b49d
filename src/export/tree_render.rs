//! ASCII tree rendering for backlogs.

use crate::models::*;

/// One-letter marker for each entity kind.
fn kind_marker(kind: EntityKind) -> char {
    match kind {
        EntityKind::Epic => 'E',
        EntityKind::Feature => 'F',
        EntityKind::UserStory => 'S',
        EntityKind::Bug => 'B',
        EntityKind::Task => 'T',
        EntityKind::SubBug => 'X',
    }
}

/// Kind-erased view of a backlog node.
struct Node<'a> {
    kind: EntityKind,
    title: &'a str,
    children: Vec<Node<'a>>,
}

fn leaf<'a>(kind: EntityKind, title: &'a str) -> Node<'a> {
    Node {
        kind,
        title,
        children: vec![],
    }
}

fn work_item<'a>(kind: EntityKind, title: &'a str, tasks: &'a [Task], sub_bugs: &'a [SubBug]) -> Node<'a> {
    Node {
        kind,
        title,
        children: tasks
            .iter()
            .map(|t| leaf(EntityKind::Task, &t.title))
            .chain(sub_bugs.iter().map(|b| leaf(EntityKind::SubBug, &b.title)))
            .collect(),
    }
}

fn epic_node(epic: &Epic) -> Node<'_> {
    Node {
        kind: EntityKind::Epic,
        title: &epic.title,
        children: epic
            .features
            .iter()
            .map(|feature| Node {
                kind: EntityKind::Feature,
                title: &feature.title,
                children: feature
                    .user_stories
                    .iter()
                    .map(|s| work_item(EntityKind::UserStory, &s.title, &s.tasks, &s.sub_bugs))
                    .chain(
                        feature
                            .bugs
                            .iter()
                            .map(|b| work_item(EntityKind::Bug, &b.title, &b.tasks, &b.sub_bugs)),
                    )
                    .collect(),
            })
            .collect(),
    }
}

/// Render a backlog as ASCII art with kind markers.
///
/// Example output:
/// ```text
/// E Onboarding
/// ├── F Signup
/// │   └── S Email signup
/// │       ├── T Create endpoint
/// │       └── T Send confirmation
/// └── F Login
/// ```
pub fn render_tree(backlog: &Backlog) -> String {
    let mut output = String::new();
    for epic in &backlog.epics {
        render_node(&mut output, &epic_node(epic), "", true, true);
    }
    output
}

/// Recursively render a node and its children.
fn render_node(output: &mut String, node: &Node<'_>, prefix: &str, is_last: bool, is_root: bool) {
    if !is_root {
        output.push_str(prefix);
        output.push_str(if is_last { "└── " } else { "├── " });
    }
    output.push(kind_marker(node.kind));
    output.push(' ');
    output.push_str(node.title);
    output.push('\n');

    let child_prefix = if is_root {
        String::new()
    } else {
        format!("{}{}", prefix, if is_last { "    " } else { "│   " })
    };

    for (i, child) in node.children.iter().enumerate() {
        let child_is_last = i == node.children.len() - 1;
        render_node(output, child, &child_prefix, child_is_last, false);
    }
}
