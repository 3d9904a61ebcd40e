//! Stream text in, typed messages out, for every registered message type.

use chrono::{DateTime, Duration, Utc};
use std::net::{IpAddr, Ipv4Addr};

use fah_client::{
    BindError, ClientSession, FormatError, Heartbeat, Info, LogRestart, LogUpdate, MessageKind,
    Options, SimulationInfo, Slot, SlotCollection, SlotOptions, SlotStatus, Unit, UnitCollection,
};

fn utc(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn session_with(text: &str) -> ClientSession {
    let session = ClientSession::standard();
    let report = session.update_from_text(text);
    assert!(report.errors.is_empty(), "{:?}", report.errors);
    session
}

#[test]
fn heartbeat() {
    let session = session_with("PyON 1 heartbeat\n{\"value\": 17}\n---\n");
    assert_eq!(session.get::<Heartbeat>().unwrap(), Some(Heartbeat { value: 17 }));
}

#[test]
fn info_sections() {
    let session = session_with(
        "PyON 1 info\n\
         [[\"FAHClient\", [\"Version\", \"7.6.21\"], [\"Platform\", \"linux2 5.4.0\"]], \
         [\"System\", [\"OS\", \"Linux\"], [\"CPUs\", \"8\"], [\"On Battery\", \"false\"], \
         [\"GPUs\", \"1\"], [\"GPU 0\", \"gpu:1:0 TU106\"]]]\n---\n",
    );
    let info = session.get::<Info>().unwrap().unwrap();
    assert_eq!(info.client.version, "7.6.21");
    assert_eq!(info.client.platform, "linux2 5.4.0");
    assert_eq!(info.system.os, "Linux");
    assert_eq!(info.system.cpus, 8);
    assert!(!info.system.on_battery);
    assert_eq!(info.system.gpu_devices, vec!["gpu:1:0 TU106"]);
}

#[test]
fn options_with_pyon_literals() {
    let session = session_with(
        "PyON 1 options\n{\"user\": \"harlam357\", \"team\": \"32\", \"passkey\": None, \
         \"gpu\": \"false\", \"pause-on-start\": True}\n---\n",
    );
    let options = session.get::<Options>().unwrap().unwrap();
    assert_eq!(options.user, "harlam357");
    assert_eq!(options.team, 32);
    assert_eq!(options.passkey, "");
    assert!(!options.gpu);
    assert!(options.pause_on_start);
}

#[test]
fn simulation_info_conversions() {
    let session = session_with(
        "PyON 1 simulation-info\n{\"project\": 13851, \"gen\": 7, \
         \"start_time\": \"2020-06-17T14:03:08Z\", \"timeout\": 1592489000, \
         \"deadline\": 0, \"eta\": 5400, \"progress\": 0.5}\n---\n",
    );
    let sim = session.get::<SimulationInfo>().unwrap().unwrap();
    assert_eq!(sim.project, 13851);
    assert_eq!(sim.generation, 7);
    assert_eq!(sim.start_time, Some(utc("2020-06-17T14:03:08Z")));
    assert_eq!(sim.timeout, DateTime::from_timestamp(1_592_489_000, 0));
    assert_eq!(sim.deadline, None);
    assert_eq!(sim.eta, Some(Duration::seconds(5400)));
    assert_eq!(sim.progress, 0.5);
}

#[test]
fn slots_and_items() {
    let session = session_with(
        "PyON 1 slots\n[{\"id\": \"00\", \"status\": \"FINISHING\", \"description\": \"cpu:4\", \
         \"options\": {\"cpus\": \"4\"}, \"idle\": False}, \
         {\"id\": \"01\", \"status\": \"SEND\", \"idle\": True}]\n---\n",
    );

    let collection = session.get::<SlotCollection>().unwrap().unwrap();
    assert_eq!(collection.slots.len(), 2);
    assert_eq!(
        collection.get("00").unwrap().options.as_ref().unwrap().cpus,
        4
    );

    let items = session.get_items::<Slot>().unwrap().unwrap();
    assert_eq!(items, collection.slots);
    assert_eq!(items[1].status, Some(SlotStatus::Send));
    assert!(items[1].idle);
}

#[test]
fn slot_options() {
    let session = session_with(
        "PyON 1 slot-options\n{\"client-type\": \"beta\", \"cpu-usage\": \"100\", \
         \"paused\": \"true\"}\n---\n",
    );
    let options = session.get::<SlotOptions>().unwrap().unwrap();
    assert_eq!(options.client_type, "beta");
    assert_eq!(options.cpu_usage, 100);
    assert!(options.paused);
}

#[test]
fn units_with_sentinels_and_addresses() {
    let session = session_with(
        "PyON 1 units\n[{\"id\": \"01\", \"state\": \"RUNNING\", \"slot\": \"00\", \
         \"percentdone\": \"42.50%\", \"ws\": \"0x8c4b4a1d\", \"cs\": \"128.252.203.10\", \
         \"assigned\": \"2020-06-17T14:03:08Z\", \"timeout\": \"<invalid>\", \
         \"deadline\": \"17/Jun/2020-16:03:08\"}]\n---\n",
    );

    let units = session.get_items::<Unit>().unwrap().unwrap();
    let unit = &units[0];
    assert_eq!(unit.percent_done, Some(42.5));
    assert_eq!(unit.ws, Some(IpAddr::V4(Ipv4Addr::new(140, 75, 74, 29))));
    assert_eq!(unit.cs, Some(IpAddr::V4(Ipv4Addr::new(128, 252, 203, 10))));
    assert_eq!(unit.assigned, Some(utc("2020-06-17T14:03:08Z")));
    assert_eq!(unit.timeout, None);
    assert_eq!(unit.deadline, Some(utc("2020-06-17T16:03:08Z")));

    let collection = session.get::<UnitCollection>().unwrap().unwrap();
    assert_eq!(collection.units, units);
}

#[test]
fn log_messages() {
    let session = session_with(
        "PyON 1 log-restart\n\"first\\nsecond\\n\"\n---\nPyON 1 log-update\n\"third\\n\"\n---\n",
    );
    assert_eq!(
        session.get::<LogRestart>().unwrap().unwrap().text,
        "first\nsecond\n"
    );
    assert_eq!(session.get::<LogUpdate>().unwrap().unwrap().text, "third\n");
}

#[test]
fn bad_field_names_its_path_and_source() {
    let session = session_with(
        "PyON 1 units\n[{\"id\": \"00\"}, {\"id\": \"01\", \"ws\": \"not-an-address\"}]\n---\n",
    );

    let err = session.get::<UnitCollection>().unwrap_err();
    assert_eq!(err.field, "units[1].ws");
    assert_eq!(err.raw, "\"not-an-address\"");
    assert!(matches!(err.source, FormatError::InvalidAddress { .. }));

    assert!(matches!(
        session.try_get::<UnitCollection>(),
        Err(BindError::Materialize(_))
    ));
}

#[test]
fn every_registered_kind_materializes_dynamically() {
    let session = session_with(
        "PyON 1 heartbeat\n1\n---\n\
         PyON 1 info\n[]\n---\n\
         PyON 1 options\n{}\n---\n\
         PyON 1 simulation-info\n{}\n---\n\
         PyON 1 slots\n[]\n---\n\
         PyON 1 slot-options\n{}\n---\n\
         PyON 1 units\n[]\n---\n\
         PyON 1 log-restart\n\"\"\n---\n\
         PyON 1 log-update\n\"\"\n---\n",
    );

    for kind in MessageKind::ALL {
        let message = session.get_dyn(kind).unwrap();
        assert!(message.is_some(), "{kind} did not materialize");
    }
}
