use super::tree::TreeNode;

const INDENT: &str = "  ";

/// Render the forest as an indented outline, one person per line.
pub fn render_forest(forest: &[TreeNode]) -> String {
    let mut out = String::new();
    for root in forest {
        render_node(root, None, &mut out);
    }
    out
}

fn render_node(node: &TreeNode, via: Option<i32>, out: &mut String) {
    let person = &node.person.person;
    out.push_str(&INDENT.repeat(node.level));
    out.push_str(&person.full_name);

    match (person.birth_date, person.death_date) {
        (None, None) => {}
        (born, died) => {
            let fmt = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();
            out.push_str(&format!(" ({} - {})", fmt(born), fmt(died)));
        }
    }
    if person.death_precedes_birth() {
        out.push_str(" [death precedes birth]");
    }

    let others: Vec<&str> = node
        .person
        .parents
        .iter()
        .filter(|p| Some(p.id) != via)
        .map(|p| p.full_name.as_str())
        .collect();
    if via.is_some() && !others.is_empty() {
        out.push_str(&format!(" (also child of {})", others.join(", ")));
    }
    out.push('\n');

    for child in &node.children {
        render_node(child, Some(person.id), out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::tests::{edge, person};
    use crate::family::tree::assemble;
    use chrono::NaiveDate;

    #[test]
    fn outlines_generations_with_indentation() {
        let mut grandma = person(1, "Grandma");
        grandma.birth_date = NaiveDate::from_ymd_opt(1930, 5, 1);
        grandma.death_date = NaiveDate::from_ymd_opt(2001, 2, 3);
        let people = vec![grandma, person(2, "Mum"), person(3, "Kid")];

        let text = render_forest(&assemble(&people, &[edge(1, 1, 2), edge(2, 2, 3)]));
        assert_eq!(
            text,
            "Grandma (1930-05-01 - 2001-02-03)\n  Mum\n    Kid\n"
        );
    }

    #[test]
    fn notes_other_parents_and_bad_dates() {
        let mut kid = person(3, "Kid");
        kid.birth_date = NaiveDate::from_ymd_opt(2000, 1, 1);
        kid.death_date = NaiveDate::from_ymd_opt(1999, 1, 1);
        let people = vec![person(1, "Mum"), person(2, "Dad"), kid];

        let text = render_forest(&assemble(&people, &[edge(1, 1, 3), edge(2, 2, 3)]));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Mum");
        assert_eq!(
            lines[1],
            "  Kid (2000-01-01 - 1999-01-01) [death precedes birth] (also child of Dad)"
        );
        assert_eq!(
            lines[3],
            "  Kid (2000-01-01 - 1999-01-01) [death precedes birth] (also child of Mum)"
        );
    }
}
