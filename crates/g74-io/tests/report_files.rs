use std::path::PathBuf;

use g74_core::{BusId, CurrentUnit, G74Error, Seconds};
use g74_io::report::{BreakerDutyReport, ReportField, ReportParser};
use g74_io::{export, load_network, CaseSnapshot};

fn repo_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join(relative)
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn parses_multi_page_report() {
    let parser = ReportParser::new(CurrentUnit::Kiloamps);
    let table = parser
        .parse_file(&repo_path("test_data/reports/breaker_duty_0.06.txt"), Seconds(0.06))
        .unwrap();

    assert_eq!(
        table.buses().collect::<Vec<_>>(),
        vec![BusId::new(1301), BusId::new(1302), BusId::new(1303)]
    );

    let a = table.record(BusId::new(1301)).unwrap();
    assert!(close(a.get(ReportField::IkInitial), 9.4503));
    assert!(close(a.get(ReportField::IbSym), 8.1234));
    assert!(close(a.dc(), 1.5207));
    assert!(close(a.peak(), 23.0105));
    assert!(!a.is_unreliable());

    let b = table.record(BusId::new(1302)).unwrap();
    assert!(b.is_overflowed(ReportField::DcSum));
    assert!(close(b.dc(), 0.6408));
    assert!(close(b.peak(), 12.1012));

    let c = table.record(BusId::new(1303)).unwrap();
    assert!(c.is_overflowed(ReportField::DcXOverR));
    assert!(close(c.dc(), 0.4029));
    assert!(close(c.get(ReportField::X), 0.3125));
    assert!(close(c.get(ReportField::IpXOverR), 7.1668));

    let unreliable = table.unreliable_buses();
    assert_eq!(
        unreliable.into_iter().collect::<Vec<_>>(),
        vec![BusId::new(1302), BusId::new(1303)]
    );
    assert_eq!(table.diagnostics.warning_count(), 2);
}

#[test]
fn deleted_copy_cannot_be_reparsed() {
    let dir = tempfile::tempdir().unwrap();
    let copy = dir.path().join("fault_ik_init0.06000.txt");
    std::fs::copy(repo_path("test_data/reports/breaker_duty_0.06.txt"), &copy).unwrap();

    let parser = ReportParser::new(CurrentUnit::Amps);
    let mut report = BreakerDutyReport::new(&copy, Seconds(0.06));
    let ik = report
        .process(&parser, true)
        .unwrap()
        .record(BusId::new(1301))
        .unwrap()
        .get(ReportField::IkInitial);
    assert!(close(ik, 9450.3));
    assert!(!copy.exists());

    assert!(matches!(
        report.process(&parser, true),
        Err(G74Error::ReportDeleted { .. })
    ));
}

#[test]
fn loads_case_fixture() {
    let network = load_network(&repo_path("test_data/cases/two_bus.json")).unwrap();
    let stats = network.stats();
    assert_eq!(stats.num_buses, 3);
    assert_eq!(stats.num_loads, 3);
    assert_eq!(stats.num_machines, 1);
    assert_eq!(stats.num_branches, 2);
    assert!(close(network.stats().total_load_mva, 17.0));

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("copy.json");
    CaseSnapshot::from_network(&network).write_json(&out).unwrap();
    let again = load_network(&out).unwrap();
    assert_eq!(again.stats().num_branches, 2);
}

#[test]
fn header_format_is_stable() {
    assert_eq!(export::column_header(0.06, "Ib sym (kA)"), "0.06 s | Ib sym (kA)");
}
