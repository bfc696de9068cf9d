//! Behavioural tests for the end-to-end analysis pipeline.

use std::cell::RefCell;

use corridor_core::Crs;
use corridor_core::test_support::crossroads;
use corridor_data::{
    AnalysisReport, AnalysisRequest, BufferDistances, InputLayer, LayerUpload, OfflineFetcher,
    PipelineError, RoadsSource, run_analysis,
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

mod support;

type Outcome = Option<Result<AnalysisReport, PipelineError>>;

#[fixture]
fn roads() -> RefCell<Option<LayerUpload>> {
    RefCell::new(None)
}

#[fixture]
fn parcels() -> RefCell<Option<LayerUpload>> {
    RefCell::new(None)
}

#[fixture]
fn outcome() -> RefCell<Outcome> {
    RefCell::new(None)
}

fn expect_report(outcome: &RefCell<Outcome>) -> std::cell::Ref<'_, AnalysisReport> {
    std::cell::Ref::map(outcome.borrow(), |slot| match slot {
        Some(Ok(report)) => report,
        Some(Err(err)) => panic!("analysis failed: {err}"),
        None => panic!("analysis has not run"),
    })
}

fn parcel_counts(report: &AnalysisReport) -> Vec<usize> {
    report
        .outcomes
        .iter()
        .map(|outcome| match &outcome.result {
            Ok(analysis) => analysis.intersections.count,
            Err(err) => panic!("distance {} failed: {err}", outcome.distance_m),
        })
        .collect()
}

#[given("a zipped road network with two crossing roads")]
fn given_zipped_roads(#[from(roads)] roads: &RefCell<Option<LayerUpload>>) {
    *roads.borrow_mut() = Some(support::roads_archive());
}

#[given("a GeoJSON road network in EPSG:4326")]
fn given_geographic_roads(#[from(roads)] roads: &RefCell<Option<LayerUpload>>) {
    *roads.borrow_mut() = Some(support::geographic_geojson("roads.geojson", &crossroads()));
}

#[given("zipped parcels set back 5, 30 and 80 metres from the road")]
fn given_zipped_parcels(#[from(parcels)] parcels: &RefCell<Option<LayerUpload>>) {
    *parcels.borrow_mut() = Some(support::parcels_archive());
}

#[given("no parcel upload")]
fn given_no_parcels(#[from(parcels)] parcels: &RefCell<Option<LayerUpload>>) {
    *parcels.borrow_mut() = None;
}

#[given("an empty parcel upload")]
fn given_empty_parcels(#[from(parcels)] parcels: &RefCell<Option<LayerUpload>>) {
    *parcels.borrow_mut() = Some(support::empty_geojson("parcels.geojson"));
}

#[when("I analyse buffers of 10 metres compared with 50 and 100 metres")]
fn when_analyse(
    #[from(roads)] roads: &RefCell<Option<LayerUpload>>,
    #[from(parcels)] parcels: &RefCell<Option<LayerUpload>>,
    #[from(outcome)] outcome: &RefCell<Outcome>,
) {
    let request = AnalysisRequest {
        parcels: parcels.borrow().clone(),
        roads: roads
            .borrow()
            .clone()
            .map_or(RoadsSource::Absent, RoadsSource::Upload),
        distances: BufferDistances::from_selection(10, &[50, 100]),
    };
    *outcome.borrow_mut() = Some(run_analysis(&request, &OfflineFetcher));
}

#[then("the parcel counts per distance are 1, 2 and 3")]
fn then_increasing_counts(#[from(outcome)] outcome: &RefCell<Outcome>) {
    assert_eq!(parcel_counts(&expect_report(outcome)), vec![1, 2, 3]);
}

#[then("the parcel counts per distance are 0, 0 and 0")]
fn then_zero_counts(#[from(outcome)] outcome: &RefCell<Outcome>) {
    assert_eq!(parcel_counts(&expect_report(outcome)), vec![0, 0, 0]);
}

#[then("every distance produces a buffer and an intersection archive")]
fn then_all_archives(#[from(outcome)] outcome: &RefCell<Outcome>) {
    let report = expect_report(outcome);
    let files: Vec<&str> = report
        .archives()
        .map(|archive| archive.file_name.as_str())
        .collect();
    assert_eq!(
        files,
        [
            "buffer_10m.zip",
            "intersection_10m.zip",
            "buffer_50m.zip",
            "intersection_50m.zip",
            "buffer_100m.zip",
            "intersection_100m.zip",
        ]
    );
}

#[then("only buffer archives are produced")]
fn then_buffer_archives(#[from(outcome)] outcome: &RefCell<Outcome>) {
    let report = expect_report(outcome);
    let files: Vec<&str> = report
        .archives()
        .map(|archive| archive.file_name.as_str())
        .collect();
    assert_eq!(files, ["buffer_10m.zip", "buffer_50m.zip", "buffer_100m.zip"]);
}

#[then("the roads are held in EPSG:32643")]
fn then_roads_in_working_crs(#[from(outcome)] outcome: &RefCell<Outcome>) {
    assert_eq!(expect_report(outcome).roads.crs(), Crs::WORKING);
}

#[then("the analysis fails because parcels are missing")]
fn then_missing_parcels(#[from(outcome)] outcome: &RefCell<Outcome>) {
    let slot = outcome.borrow();
    assert!(
        matches!(
            slot.as_ref(),
            Some(Err(PipelineError::MissingInput {
                layer: InputLayer::Parcels
            }))
        ),
        "expected a missing parcels error"
    );
}

#[scenario(path = "tests/features/analysis.feature", index = 0)]
fn scenario_compare_distances(
    roads: RefCell<Option<LayerUpload>>,
    parcels: RefCell<Option<LayerUpload>>,
    outcome: RefCell<Outcome>,
) {
    let _ = (roads, parcels, outcome);
}

#[scenario(path = "tests/features/analysis.feature", index = 1)]
fn scenario_geographic_roads(
    roads: RefCell<Option<LayerUpload>>,
    parcels: RefCell<Option<LayerUpload>>,
    outcome: RefCell<Outcome>,
) {
    let _ = (roads, parcels, outcome);
}

#[scenario(path = "tests/features/analysis.feature", index = 2)]
fn scenario_missing_parcels(
    roads: RefCell<Option<LayerUpload>>,
    parcels: RefCell<Option<LayerUpload>>,
    outcome: RefCell<Outcome>,
) {
    let _ = (roads, parcels, outcome);
}

#[scenario(path = "tests/features/analysis.feature", index = 3)]
fn scenario_empty_parcels(
    roads: RefCell<Option<LayerUpload>>,
    parcels: RefCell<Option<LayerUpload>>,
    outcome: RefCell<Outcome>,
) {
    let _ = (roads, parcels, outcome);
}
