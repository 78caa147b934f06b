// The graph UI reads `type` and `state_data.resdata.dag.{nodes,edges}`.
// These tests pin that shape.

use dagstream_core::types::{Dag, DagEdge, DagNode, StateFrame, STATE_FRAME_TYPE};

#[test]
fn state_frame_top_level_keys() {
    let json = StateFrame::new(Dag::release_pipeline()).to_json().unwrap();

    assert!(json.starts_with(r#"{"type":"state","state_data":{"resdata":{"dag":{"nodes":["#));
    // compact encoding, one SSE data line per frame
    assert!(!json.contains('\n'));
}

#[test]
fn node_and_edge_fields() {
    let dag = Dag {
        nodes: vec![DagNode::named("a"), DagNode::named("b")],
        edges: vec![DagEdge::between("a", "b")],
    };
    let value: serde_json::Value =
        serde_json::from_str(&StateFrame::new(dag).to_json().unwrap()).unwrap();

    let dag = &value["state_data"]["resdata"]["dag"];
    assert_eq!(dag["nodes"][0]["id"], "a");
    assert_eq!(dag["nodes"][0]["label"], "a");
    assert_eq!(dag["edges"][0]["id"], "a-b");
    assert_eq!(dag["edges"][0]["source"], "a");
    assert_eq!(dag["edges"][0]["target"], "b");
}

#[test]
fn parses_frame_from_ui_fixture() {
    let json = r#"{"type":"state","state_data":{"resdata":{"dag":{
        "nodes":[{"id":"active","label":"active"}],
        "edges":[{"id":"e1","source":"active","target":"active"}]}}}}"#;
    let frame: StateFrame = serde_json::from_str(json).unwrap();

    assert_eq!(frame.frame_type, STATE_FRAME_TYPE);
    assert_eq!(frame.dag().nodes[0].label, "active");
    assert_eq!(frame.dag().edges[0].id, "e1");
}
