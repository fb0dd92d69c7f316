// core/tests/test_projector.rs
use fitconvert_core::{
    project, Checksum, Chunk, DataMessage, DecodeError, DefinitionMessage, Endian, FieldData,
    FieldDefinition, FieldValue, FileHeader, Frame, MessageFilter, MessageHeader, ProjectOptions,
};
use serde_json::{json, Value};

fn header() -> Frame {
    Frame::Header(FileHeader {
        header_size: 14,
        proto_ver: (2, 0),
        profile_ver: (21, 40),
        body_size: 4096,
        crc: Some(0x1A2),
        crc_matched: true,
        chunk: Chunk { index: 0, offset: 0, size: 14 },
    })
}

fn definition(name: &str, num: u16) -> Frame {
    Frame::DefinitionMessage(DefinitionMessage {
        name: name.to_string(),
        global_mesg_num: num,
        header: MessageHeader { local_mesg_num: 1, time_offset: None, is_developer_data: false },
        endian: Endian::Little,
        field_defs: vec![FieldDefinition {
            name: "timestamp".into(),
            def_num: 253,
            type_name: "date_time".into(),
            base_type_name: "uint32".into(),
            size: 4,
        }],
        dev_field_defs: vec![],
        chunk: Chunk::default(),
    })
}

fn data(name: &str, num: u16, hr: i64) -> Frame {
    Frame::DataMessage(
        DataMessage::new(name, num)
            .with_field(FieldData::new("heart_rate", FieldValue::Int(hr)).with_units("bpm")),
    )
}

fn crc() -> Frame {
    Frame::Crc(Checksum { crc: 0xBEEF, matched: true, chunk: Chunk::default() })
}

fn stream() -> Vec<Frame> {
    vec![
        header(),
        definition("file_id", 0),
        data("file_id", 0, 0),
        definition("record", 20),
        data("record", 20, 120),
        data("record", 20, 121),
        definition("session", 18),
        data("session", 18, 130),
        data("lap", 19, 125),
        crc(),
    ]
}

fn ok(frames: Vec<Frame>) -> Vec<Result<Frame, DecodeError>> {
    frames.into_iter().map(Ok).collect()
}

fn keep_all() -> ProjectOptions {
    ProjectOptions { suppress_definitions: false, ..Default::default() }
}

fn frame_types(frames: &[Value]) -> Vec<&str> {
    frames.iter().map(|f| f["frame_type"].as_str().unwrap()).collect()
}

#[test]
fn renders_every_variant_in_decode_order() {
    let p = project(ok(stream()), &keep_all());
    assert!(p.diagnostic.is_none());
    assert_eq!(p.frames.len(), 10);
    assert_eq!(frame_types(&p.frames)[..4], ["header", "definition_message", "data_message", "definition_message"]);
    assert_eq!(p.frames[9]["frame_type"], "crc");
    assert_eq!(p.frames[9]["crc"], "0xbeef");
    assert_eq!(p.frames[0]["crc"], "0x01a2");

    let def = &p.frames[1];
    assert_eq!(def["global_mesg_num"], 0);
    assert_eq!(def["endian"], "<");
    assert_eq!(def["header"], json!({"local_mesg_num": 1, "time_offset": null, "is_developer_data": false}));
    assert_eq!(
        def["field_defs"][0],
        json!({"name": "timestamp", "def_num": 253, "type_name": "date_time", "base_type_name": "uint32", "size": 4})
    );
    assert_eq!(def["dev_field_defs"], json!([]));
}

#[test]
fn definitions_are_suppressed_by_default() {
    let p = project(ok(stream()), &ProjectOptions::default());
    assert!(frame_types(&p.frames).iter().all(|t| *t != "definition_message"));
    assert_eq!(p.frames.len(), 7);
}

#[test]
fn suppression_wins_over_filter() {
    let opts = ProjectOptions {
        filter: ["record"].into_iter().collect(),
        suppress_definitions: true,
    };
    let p = project(ok(stream()), &opts);
    assert_eq!(frame_types(&p.frames), ["header", "data_message", "data_message", "crc"]);
}

#[test]
fn filtering_is_a_subset_of_the_unfiltered_output() {
    let unfiltered = project(ok(stream()), &keep_all()).frames;

    for keys in [vec!["record"], vec!["18"], vec!["session", "20"], vec!["nothing"]] {
        let filter: MessageFilter = keys.iter().copied().collect();
        let filtered = project(ok(stream()), &ProjectOptions { filter: filter.clone(), suppress_definitions: false }).frames;

        let expected: Vec<Value> = stream()
            .iter()
            .zip(unfiltered.iter())
            .filter(|(frame, _)| match frame.message_identity() {
                Some((name, num)) => filter.accepts(name, num),
                None => true,
            })
            .map(|(_, v)| v.clone())
            .collect();
        assert_eq!(filtered, expected, "filter {keys:?}");
    }
}

#[test]
fn header_and_crc_survive_any_filter() {
    let opts = ProjectOptions { filter: ["nothing"].into_iter().collect(), suppress_definitions: false };
    let p = project(ok(stream()), &opts);
    assert_eq!(frame_types(&p.frames), ["header", "crc"]);
}

#[test]
fn projection_is_idempotent() {
    let opts = ProjectOptions { filter: ["record", "18"].into_iter().collect(), suppress_definitions: false };
    let a = project(ok(stream()), &opts).to_json().unwrap();
    let b = project(ok(stream()), &opts).to_json().unwrap();
    assert_eq!(a, b);
}

#[test]
fn truncated_stream_keeps_good_frames() {
    let mut items = ok(vec![header(), data("record", 20, 100), data("record", 20, 101)]);
    items.push(Err(DecodeError::CrcMismatch { frame: "crc", crc: 0x1234 }));
    items.push(Ok(crc()));

    let p = project(items, &keep_all());
    assert_eq!(p.frames.len(), 3);
    let diag = p.diagnostic.expect("diagnostic");
    assert_eq!(diag.frames_kept, 3);
    assert!(diag.message.contains("CRC mismatch"), "{}", diag.message);
}

#[test]
fn fault_before_first_frame_gives_empty_list() {
    let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
    let p = project(vec![Err(DecodeError::Io(io))], &keep_all());
    assert!(p.frames.is_empty());
    assert_eq!(p.to_json().unwrap(), "[]");
    let diag = p.diagnostic.as_ref().unwrap();
    assert_eq!(diag.causes, ["short read"]);
}
