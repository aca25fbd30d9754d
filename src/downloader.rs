use crate::taxonomy::FlatNode;

/// Convert a category listing to CSV format
///
/// Exports the rows in the order given, usually the flattened and filtered
/// listing the user is looking at. The header row is
/// `id,level,name,url,active`; names are indented two spaces per level so the
/// hierarchy stays readable in a spreadsheet. Fields containing commas,
/// quotes or newlines are quoted.
///
/// # Examples
/// ```
/// use std::collections::HashSet;
/// use catalog_admin::downloader::to_csv;
/// use catalog_admin::taxonomy::{build_tree, flatten};
///
/// let tree = build_tree(&[]);
/// let csv = to_csv(&flatten(&tree, &HashSet::new()));
/// assert_eq!(csv, "id,level,name,url,active\n");
/// ```
pub fn to_csv(rows: &[FlatNode<'_>]) -> String {
    let mut csv_content = String::from("id,level,name,url,active\n");

    for row in rows {
        let name = format!("{}{}", "  ".repeat(row.level), row.node.name);
        csv_content.push_str(&row.node.id.to_string());
        csv_content.push(',');
        csv_content.push_str(&row.level.to_string());
        csv_content.push(',');
        csv_content.push_str(&escape_field(&name));
        csv_content.push(',');
        csv_content.push_str(&escape_field(&row.node.url));
        csv_content.push(',');
        csv_content.push(if row.node.active { '1' } else { '0' });
        csv_content.push('\n');
    }

    csv_content
}

fn escape_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::CategoryNode;

    #[test]
    fn indents_and_escapes() {
        let parent = CategoryNode {
            id: 1,
            name: "Bags, Cases".to_string(),
            url: "/bags".to_string(),
            active: true,
            children: Vec::new(),
        };
        let child = CategoryNode {
            id: 2,
            name: "14\" Laptop".to_string(),
            url: "/bags/laptop".to_string(),
            active: false,
            children: Vec::new(),
        };
        let rows = [
            FlatNode {
                node: &parent,
                level: 0,
            },
            FlatNode {
                node: &child,
                level: 1,
            },
        ];

        let csv = to_csv(&rows);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[1], "1,0,\"Bags, Cases\",/bags,1");
        assert_eq!(lines[2], "2,1,\"  14\"\" Laptop\",/bags/laptop,0");
    }
}
