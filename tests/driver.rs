//! Driver-loop contract tests against an instrumented engine.
//!
//! The probe engine records every call the driver makes so step counts,
//! disable timing, and query behavior can be asserted without any real
//! physics underneath.

use std::fs;
use std::path::PathBuf;

use nalgebra::{point, vector, Isometry3, Point3, Vector3};

use talus::config::{SimulationParams, WriteMode};
use talus::driver::{DriverState, SimulationDriver};
use talus::engine::{BcId, GranularEngine};
use talus::mesh::MeshSoupEntry;
use talus::Result;

/// Records driver calls; performs no physics.
#[derive(Default)]
struct ProbeEngine {
    advances: u64,
    num_bcs: usize,
    tracked: Vec<bool>,
    /// `(boundary, advances completed when the disable arrived)`.
    disable_calls: Vec<(BcId, u64)>,
    /// When set, even tracked boundaries report no force data.
    fail_queries: bool,
    num_particles: usize,
}

impl ProbeEngine {
    fn push_bc(&mut self, track_forces: bool) -> BcId {
        self.tracked.push(track_forces);
        self.num_bcs += 1;
        self.num_bcs - 1
    }
}

impl GranularEngine for ProbeEngine {
    fn set_particles(&mut self, positions: &[Point3<f64>]) {
        self.num_particles = positions.len();
    }

    fn create_bc_plane(&mut self, _: Point3<f64>, _: Vector3<f64>, track_forces: bool) -> BcId {
        self.push_bc(track_forces)
    }

    fn create_bc_cylinder_z(&mut self, _: Point3<f64>, _: f64, track_forces: bool) -> BcId {
        self.push_bc(track_forces)
    }

    fn create_bc_cone_z(&mut self, _: Point3<f64>, _: f64, _: f64, _: f64, track: bool) -> BcId {
        self.push_bc(track)
    }

    fn disable_bc(&mut self, id: BcId) {
        self.disable_calls.push((id, self.advances));
    }

    fn bc_reaction_force(&self, id: BcId) -> Option<Vector3<f64>> {
        if !self.fail_queries && self.tracked.get(id).copied().unwrap_or(false) {
            Some(vector![0.0, 0.0, 42.0])
        } else {
            None
        }
    }

    fn load_meshes(&mut self, _: &[MeshSoupEntry]) -> Result<()> {
        Ok(())
    }

    fn apply_mesh_motion(&mut self, _: usize, _: Isometry3<f64>, _: Vector3<f64>, _: Vector3<f64>) {
    }

    fn mesh_contact_force_torque(&self, _: usize) -> (Vector3<f64>, Vector3<f64>) {
        (Vector3::zeros(), Vector3::zeros())
    }

    fn initialize(&mut self) {}

    fn advance(&mut self, _dt: f64) {
        self.advances += 1;
    }

    fn steps_completed(&self) -> u64 {
        self.advances
    }

    fn particle_positions(&self) -> Vec<Point3<f64>> {
        vec![Point3::origin(); self.num_particles]
    }

    fn particle_velocities(&self) -> Vec<Vector3<f64>> {
        vec![Vector3::zeros(); self.num_particles]
    }
}

fn scratch_params(name: &str) -> SimulationParams {
    let dir = std::env::temp_dir().join(format!("talus-it-{}-{name}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    SimulationParams {
        output_dir: dir,
        write_mode: WriteMode::None,
        ..SimulationParams::default()
    }
}

fn probe_driver(params: SimulationParams) -> SimulationDriver<ProbeEngine> {
    SimulationDriver::new(ProbeEngine::default(), params).unwrap()
}

#[test]
fn reference_settling_run_takes_exactly_250k_steps() {
    // radius 1, density 2.5, box (400, 100, 50), step 2e-5, end 5.0.
    let params = scratch_params("reference");
    assert_eq!(params.sphere_radius, 1.0);
    assert_eq!(params.sphere_density, 2.5);
    assert_eq!(params.time_end, 5.0);

    let mut driver = probe_driver(params);
    driver.initialize().unwrap();
    let summary = driver.run().unwrap();

    assert_eq!(summary.steps_taken, 250_000);
    assert_eq!(driver.engine().advances, 250_000);
    assert_eq!(driver.state(), DriverState::Done);
}

#[test]
fn step_count_is_floor_of_duration_over_step() {
    let params = SimulationParams {
        step_size: 0.3,
        time_end: 1.0,
        ..scratch_params("floor")
    };
    let mut driver = probe_driver(params);
    driver.initialize().unwrap();
    let summary = driver.run().unwrap();

    assert_eq!(summary.steps_taken, 3);
    assert!(summary.final_time < 1.0);
    assert!(1.0 <= summary.final_time + 0.3);
}

#[test]
fn zero_duration_run_completes_without_stepping() {
    let params = SimulationParams {
        time_end: 0.0,
        ..scratch_params("zero")
    };
    let mut driver = probe_driver(params);
    driver.initialize().unwrap();
    let summary = driver.run().unwrap();

    assert_eq!(summary.steps_taken, 0);
    assert_eq!(summary.frames_rendered, 0);
    assert_eq!(driver.state(), DriverState::Done);
}

#[test]
fn scheduled_disable_fires_once_on_strict_threshold_crossing() {
    let params = SimulationParams {
        step_size: 0.25,
        time_end: 2.0,
        ..scratch_params("disable")
    };
    let mut driver = probe_driver(params);
    let plate = driver
        .create_bc_plane(point![0.0, 0.0, -10.0], vector![0.0, 0.0, 1.0], false)
        .unwrap();
    driver.schedule_disable(plate, 0.5).unwrap();
    driver.initialize().unwrap();
    driver.run().unwrap();

    // Iterations see t = 0, 0.25, 0.5, 0.75, ...; the strict comparison
    // skips t = 0.5 exactly, so the disable lands when 3 advances are done.
    let calls = &driver.engine().disable_calls;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], (0, 3));
    assert!(!driver.boundaries().is_enabled(plate).unwrap());
}

#[test]
fn disable_scheduled_beyond_end_time_never_fires() {
    let params = SimulationParams {
        step_size: 0.25,
        time_end: 1.0,
        ..scratch_params("neverfire")
    };
    let mut driver = probe_driver(params);
    let plate = driver
        .create_bc_plane(point![0.0, 0.0, -10.0], vector![0.0, 0.0, 1.0], false)
        .unwrap();
    driver.schedule_disable(plate, 5.0).unwrap();
    driver.initialize().unwrap();
    driver.run().unwrap();

    assert!(driver.engine().disable_calls.is_empty());
    assert!(driver.boundaries().is_enabled(plate).unwrap());
}

#[test]
fn failed_force_queries_do_not_stop_the_run() {
    let params = SimulationParams {
        step_size: 0.1,
        time_end: 1.0,
        ..scratch_params("failquery")
    };
    let mut driver = SimulationDriver::new(
        ProbeEngine {
            fail_queries: true,
            ..ProbeEngine::default()
        },
        params,
    )
    .unwrap();
    driver
        .create_bc_plane(point![0.0, 0.0, -10.0], vector![0.0, 0.0, 1.0], true)
        .unwrap();
    driver.initialize().unwrap();
    let summary = driver.run().unwrap();

    assert_eq!(summary.steps_taken, 10);
    assert_eq!(driver.state(), DriverState::Done);
}

#[test]
fn hook_fires_every_iteration_before_the_advance() {
    let params = SimulationParams {
        step_size: 0.5,
        time_end: 2.0,
        ..scratch_params("hook")
    };
    let mut driver = probe_driver(params);
    driver.initialize().unwrap();

    let mut seen = Vec::new();
    driver
        .run_with_hook(|_meshes, engine, time| {
            seen.push((time, engine.advances));
            Ok(())
        })
        .unwrap();

    // The hook observes the time of the iteration and the advances of all
    // previous iterations.
    assert_eq!(
        seen,
        vec![(0.0, 0), (0.5, 1), (1.0, 2), (1.5, 3)]
    );
}

#[test]
fn snapshot_files_follow_the_capture_cadence() {
    let params = SimulationParams {
        step_size: 0.1,
        time_end: 1.0,
        captures_per_frame: 3,
        write_mode: WriteMode::Csv,
        ..scratch_params("files")
    };
    let out_dir = params.output_dir.clone();
    let mut driver = probe_driver(params);
    driver
        .set_particles(&[point![0.0, 0.0, 0.0], point![1.0, 1.0, 1.0]])
        .unwrap();
    driver.initialize().unwrap();
    let summary = driver.run().unwrap();

    // 10 capture ticks at 3 per frame: frames at ticks 3, 6, 9.
    assert_eq!(summary.steps_taken, 10);
    assert_eq!(summary.frames_rendered, 3);

    let mut names: Vec<String> = fs::read_dir(&out_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["step000000.csv", "step000001.csv", "step000002.csv"]);
    let _ = fs::remove_dir_all(&out_dir);
}

#[test]
fn unwritable_output_directory_fails_before_any_stepping() {
    let blocker = std::env::temp_dir().join(format!("talus-it-blocker-{}", std::process::id()));
    fs::write(&blocker, b"not a directory").unwrap();

    let params = SimulationParams {
        output_dir: PathBuf::from(&blocker).join("out"),
        ..SimulationParams::default()
    };
    let res = SimulationDriver::new(ProbeEngine::default(), params);
    assert!(matches!(res, Err(talus::Error::Io(_))));
    let _ = fs::remove_file(&blocker);
}
