use crate::*;

#[test]
fn normalize_expands_single_letter_ids_consistently() {
    let out = normalize("flowchart TD\nA[Login Page] --> B[Auth Service]\nB --> C[Database]");
    assert_eq!(out.outcome, NormalizeOutcome::Normalized);
    assert_eq!(
        out.code,
        "flowchart TD\nNODE_A[Login Page] --> NODE_B[Auth Service]\nNODE_B --> NODE_C[Database]"
    );
    let stages: Vec<&str> = out.candidates.iter().map(|c| c.stage).collect();
    assert_eq!(
        stages,
        vec![
            "line-breaks",
            "asides",
            "grouping",
            "shapes",
            "edge-labels",
            "spacing",
            "identifiers"
        ]
    );
}

#[test]
fn normalize_repairs_llm_style_diagram() {
    let src = "flowchartTD\r\nA[ASP Pages<br>(e.g., Rlv_2)] -->|calls| B(API Gateway)\r\n\r\nB -- \"reads\" --> C[(Orders DB)]:::db\r\nclass A,B edge;";
    let out = normalize(src);
    assert_eq!(
        out.code,
        "flowchart TD\nNODE_A[ASP Pages] --> NODE_B[API Gateway]\nNODE_B --> DB_C[Orders DB]:::db\nclass NODE_A,NODE_B edge;"
    );
    assert_eq!(
        out.candidate("asides"),
        Some("flowchartTD\r\nA[ASP Pages] -->|calls| B(API Gateway)\r\n\r\nB -- \"reads\" --> C[(Orders DB)]:::db\r\nclass A,B edge;")
    );
}

#[test]
fn normalize_is_idempotent_on_its_output() {
    let src = "flowchartTD\nA[ASP Pages<br>(e.g., Rlv_2)] -->|calls| B(API Gateway)\nB -- \"reads\" --> C[(Orders DB)]:::db";
    let once = normalize(src).code;
    assert_eq!(normalize(&once).code, once);
}

#[test]
fn normalize_removes_every_line_break_tag() {
    for src in [
        "flowchart TD\nA[one<br>two] --> B[three<br/>four]",
        "flowchart TD\nA[one <BR /> two]",
        "flowchart TD\nA[x<br  >y] --> B",
    ] {
        let out = normalize(src).code.to_ascii_lowercase();
        assert!(!out.contains("<br"), "{out}");
    }
}

#[test]
fn normalize_flattens_unclosed_subgraph() {
    let out = normalize("flowchart TD\nsubgraph Core\n  X[Ingest] --> Y[Transform]\n  Z[Publish]");
    assert_eq!(out.outcome, NormalizeOutcome::Flattened);
    assert_eq!(
        out.code,
        "flowchart TD\n  X[Ingest]\n  Y[Transform]\n  Z[Publish]\n  X --> Y\n  Y --> Z"
    );
    // Later passes are skipped once a replacement diagram is produced.
    assert_eq!(out.candidates.len(), 3);
}

#[test]
fn normalize_substitutes_placeholder_without_nodes() {
    let out = normalize("flowchart TD\nsubgraph Core\n  X --> Y\n");
    assert_eq!(out.outcome, NormalizeOutcome::Placeholder);
    assert_eq!(out.code, GENERIC_ARCHITECTURE);
}

#[test]
fn normalize_keeps_repairable_subgraphs() {
    let out = normalize("flowchart LR\nsubgraph  Edge {\nA[Web] --> B[Api]\n}");
    assert_eq!(out.outcome, NormalizeOutcome::Normalized);
    assert_eq!(
        out.code,
        "flowchart LR\nsubgraph Edge\nNODE_A[Web] --> NODE_B[Api]\nend"
    );
}

#[test]
fn colliding_definitions_share_one_expanded_id() {
    let out = normalize(
        "flowchart TD\nA[Primary A] --> B[Backup]\nA[Secondary A] --> C[Audit]\nclass A core;",
    );
    assert_eq!(
        out.code,
        "flowchart TD\nNODE_A[Primary A] --> NODE_B[Backup]\nNODE_A[Secondary A] --> NODE_C[Audit]\nclass NODE_A core;"
    );
}

#[test]
fn normalize_empty_input_runs_nothing() {
    let out = normalize(" \n\t");
    assert_eq!(out.code, "");
    assert!(out.candidates.is_empty());
}

#[test]
fn each_candidate_is_a_separate_string() {
    let src = "flowchart TD\nA[x<br>y] --> B";
    let out = normalize(src);
    assert_eq!(out.candidate("line-breaks"), Some("flowchart TD\nA[x y] --> B"));
    assert_eq!(
        out.candidate("identifiers"),
        Some("flowchart TD\nNODE_A[x y] --> B")
    );
}

#[test]
fn custom_pipeline_runs_only_given_stages() {
    let pipeline = Pipeline::new(vec![Stage {
        name: "upper",
        apply: |s: &str| Step::Continue(s.to_uppercase()),
    }]);
    let out = pipeline.run("graph td");
    assert_eq!(out.code, "GRAPH TD");
    assert_eq!(out.candidate("upper"), Some("GRAPH TD"));
}
