//! Graph export for visualization: Graphviz DOT and a self-contained
//! vis-network HTML page.

use crate::model::{Edge, EdgeMetadata, Insight};

/// Short display label for a node.
fn node_label(i: &Insight) -> String {
    let content = i.content.replace('\n', " ");
    let content = if content.chars().count() > 60 {
        let truncated: String = content.chars().take(60).collect();
        format!("{truncated}...")
    } else {
        content
    };
    format!("[{}] {}", i.category, content)
}

fn trunc_id(id: &str) -> &str {
    if id.len() > 8 {
        &id[..8]
    } else {
        id
    }
}

fn category_color(category: &str) -> &'static str {
    match category {
        "decision" => "#e74c3c",
        "fact" => "#3498db",
        "insight" => "#9b59b6",
        "preference" => "#2ecc71",
        "context" => "#f39c12",
        _ => "#95a5a6",
    }
}

fn edge_color(edge_type: &str) -> &'static str {
    match edge_type {
        "temporal" => "#aaaaaa",
        "semantic" => "#3498db",
        "causal" => "#e74c3c",
        "entity" => "#2ecc71",
        _ => "#cccccc",
    }
}

fn edge_label(e: &Edge) -> String {
    let sub_type = match &e.metadata {
        EdgeMetadata::Temporal { sub_type, .. } => Some(sub_type.as_str()),
        EdgeMetadata::Causal { sub_type, .. } => Some(sub_type.as_str()),
        _ => None,
    };
    sub_type.unwrap_or(e.edge_type.as_str()).to_string()
}

/// Render the graph as a Graphviz DOT digraph. Edges touching deleted
/// nodes are skipped.
pub fn render_dot(insights: &[Insight], edges: &[Edge]) -> String {
    let mut lines = vec![
        "digraph mnemon {".to_string(),
        "  rankdir=LR;".to_string(),
        "  node [shape=box, style=\"filled,rounded\", fontsize=10, fontname=\"Helvetica\"];"
            .to_string(),
        "  edge [fontsize=8, fontname=\"Helvetica\"];".to_string(),
        String::new(),
    ];

    let active: std::collections::HashSet<&str> =
        insights.iter().map(|i| i.id.as_str()).collect();

    for i in insights {
        let label = node_label(i).replace('"', "\\\"");
        let short_id = trunc_id(&i.id);
        let color = category_color(i.category.as_str());
        lines.push(format!(
            "  \"{}\" [label=\"{}: {}\", fillcolor=\"{}\", fontcolor=\"white\"];",
            i.id, short_id, label, color
        ));
    }

    lines.push(String::new());
    for e in edges {
        if !active.contains(e.source_id.as_str()) || !active.contains(e.target_id.as_str()) {
            continue;
        }
        let color = edge_color(e.edge_type.as_str());
        lines.push(format!(
            "  \"{}\" -> \"{}\" [label=\"{}\", color=\"{}\", fontcolor=\"{}\"];",
            e.source_id,
            e.target_id,
            edge_label(e),
            color,
            color
        ));
    }

    lines.push("}".to_string());
    lines.push(String::new());
    lines.join("\n")
}

/// Render the graph as an interactive vis-network HTML page.
pub fn render_html(insights: &[Insight], edges: &[Edge]) -> String {
    let active: std::collections::HashSet<&str> =
        insights.iter().map(|i| i.id.as_str()).collect();

    let js_str = |s: &str| serde_json::to_string(s).unwrap_or_else(|_| "\"\"".into());

    let nodes_js = insights
        .iter()
        .map(|i| {
            let label = format!("{}: {}", trunc_id(&i.id), node_label(i).replace('\n', " "));
            format!(
                "{{id:{},label:{},title:{},color:{},font:{{color:\"white\"}}}}",
                js_str(&i.id),
                js_str(&label),
                js_str(&i.content),
                js_str(category_color(i.category.as_str())),
            )
        })
        .collect::<Vec<_>>()
        .join(",\n");

    let edges_js = edges
        .iter()
        .filter(|e| {
            active.contains(e.source_id.as_str()) && active.contains(e.target_id.as_str())
        })
        .map(|e| {
            let color = edge_color(e.edge_type.as_str());
            format!(
                "{{from:{},to:{},label:{},color:{{color:{}}},arrows:\"to\",font:{{color:{},size:10}}}}",
                js_str(&e.source_id),
                js_str(&e.target_id),
                js_str(&edge_label(e)),
                js_str(color),
                js_str(color),
            )
        })
        .collect::<Vec<_>>()
        .join(",\n");

    HTML_TEMPLATE
        .replace("%NODES%", &nodes_js)
        .replace("%EDGES%", &edges_js)
}

const HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Mnemon Knowledge Graph</title>
<script src="https://unpkg.com/vis-network/standalone/umd/vis-network.min.js"></script>
<style>
  body { margin: 0; padding: 0; background: #1a1a2e; font-family: sans-serif; }
  #graph { width: 100vw; height: 100vh; }
  #legend { position: fixed; top: 10px; right: 10px; background: rgba(0,0,0,0.7);
    color: white; padding: 12px; border-radius: 8px; font-size: 12px; }
  .leg-item { display: flex; align-items: center; margin: 4px 0; }
  .leg-dot { width: 12px; height: 12px; border-radius: 50%; margin-right: 8px; }
  .leg-line { width: 20px; height: 3px; margin-right: 8px; }
</style>
</head>
<body>
<div id="graph"></div>
<div id="legend">
  <b>Nodes</b>
  <div class="leg-item"><div class="leg-dot" style="background:#e74c3c"></div>decision</div>
  <div class="leg-item"><div class="leg-dot" style="background:#3498db"></div>fact</div>
  <div class="leg-item"><div class="leg-dot" style="background:#9b59b6"></div>insight</div>
  <div class="leg-item"><div class="leg-dot" style="background:#2ecc71"></div>preference</div>
  <div class="leg-item"><div class="leg-dot" style="background:#f39c12"></div>context</div>
  <div class="leg-item"><div class="leg-dot" style="background:#95a5a6"></div>general</div>
  <br><b>Edges</b>
  <div class="leg-item"><div class="leg-line" style="background:#aaaaaa"></div>temporal</div>
  <div class="leg-item"><div class="leg-line" style="background:#3498db"></div>semantic</div>
  <div class="leg-item"><div class="leg-line" style="background:#e74c3c"></div>causal</div>
  <div class="leg-item"><div class="leg-line" style="background:#2ecc71"></div>entity</div>
</div>
<script>
var nodes = new vis.DataSet([%NODES%]);
var edges = new vis.DataSet([%EDGES%]);
var container = document.getElementById("graph");
var data = { nodes: nodes, edges: edges };
var options = {
  physics: { solver: "forceAtlas2Based", forceAtlas2Based: { gravitationalConstant: -30 } },
  interaction: { hover: true, tooltipDelay: 100 },
  nodes: { shape: "box", margin: 8, borderWidth: 0, font: { size: 11 } },
  edges: { smooth: { type: "continuous" }, font: { size: 9 } }
};
new vis.Network(container, data, options);
</script>
</body>
</html>"#;
