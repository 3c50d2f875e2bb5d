//! Minimal CPU stepping backend.
//!
//! Ballistic integration plus projection onto enabled boundary surfaces.
//! There are no particle-particle contacts and no mesh collisions; meshes
//! are pose-tracked only. This backend exists so drivers, scenarios, and
//! tests run headless with plausible boundary reaction forces.

use nalgebra::{vector, Isometry3, Point3, Vector3};

use super::{BcId, GranularEngine};
use crate::config::SimulationParams;
use crate::error::Result;
use crate::mesh::MeshSoupEntry;

const EPS_RADIAL: f64 = 1.0e-12;

struct Particle {
    position: Point3<f64>,
    velocity: Vector3<f64>,
}

enum BcGeom {
    Plane {
        point: Point3<f64>,
        normal: Vector3<f64>,
    },
    CylinderZ {
        center: Point3<f64>,
        radius: f64,
    },
    ConeZ {
        tip: Point3<f64>,
        slope: f64,
        hmax: f64,
        hmin: f64,
    },
}

impl BcGeom {
    /// Project a penetrating particle back onto the admissible side and kill
    /// its approach velocity. Returns the contact normal while touching.
    fn resolve(&self, p: &mut Particle, radius: f64) -> Option<Vector3<f64>> {
        match self {
            BcGeom::Plane { point, normal } => {
                let depth = (p.position - point).dot(normal) - radius;
                if depth < 0.0 {
                    p.position -= *normal * depth;
                    let vn = p.velocity.dot(normal);
                    if vn < 0.0 {
                        p.velocity -= *normal * vn;
                    }
                    Some(*normal)
                } else {
                    None
                }
            }
            BcGeom::CylinderZ { center, radius: rc } => {
                clamp_radially(p, center, rc - radius)
            }
            BcGeom::ConeZ {
                tip,
                slope,
                hmax,
                hmin,
            } => {
                if p.position.z < *hmin || p.position.z > *hmax {
                    return None;
                }
                let allowed = (slope * (p.position.z - tip.z) - radius).max(0.0);
                clamp_radially(p, tip, allowed)
            }
        }
    }
}

/// Keep a particle within horizontal distance `limit` of the vertical axis
/// through `axis_point`.
fn clamp_radially(
    p: &mut Particle,
    axis_point: &Point3<f64>,
    limit: f64,
) -> Option<Vector3<f64>> {
    let limit = limit.max(0.0);
    let dx = p.position.x - axis_point.x;
    let dy = p.position.y - axis_point.y;
    let rr = (dx * dx + dy * dy).sqrt();
    if rr <= limit || rr <= EPS_RADIAL {
        return None;
    }
    let outward = vector![dx / rr, dy / rr, 0.0];
    p.position.x = axis_point.x + outward.x * limit;
    p.position.y = axis_point.y + outward.y * limit;
    let vr = p.velocity.dot(&outward);
    if vr > 0.0 {
        p.velocity -= outward * vr;
    }
    Some(-outward)
}

struct Bc {
    geom: BcGeom,
    tracked: bool,
    enabled: bool,
    reaction: Vector3<f64>,
}

struct MeshState {
    pose: Isometry3<f64>,
    force: Vector3<f64>,
    torque: Vector3<f64>,
}

pub struct KinematicEngine {
    gravity: Vector3<f64>,
    sphere_radius: f64,
    sphere_mass: f64,
    particles: Vec<Particle>,
    bcs: Vec<Bc>,
    meshes: Vec<MeshState>,
    steps: u64,
    initialized: bool,
}

impl KinematicEngine {
    pub fn new(sphere_radius: f64, sphere_density: f64, gravity: Vector3<f64>) -> Self {
        let sphere_mass =
            4.0 / 3.0 * std::f64::consts::PI * sphere_density * sphere_radius.powi(3);
        Self {
            gravity,
            sphere_radius,
            sphere_mass,
            particles: Vec::new(),
            bcs: Vec::new(),
            meshes: Vec::new(),
            steps: 0,
            initialized: false,
        }
    }

    /// Convenience constructor. The contact stiffness/damping entries of
    /// the parameter set are ignored by this backend.
    pub fn from_params(params: &SimulationParams) -> Self {
        Self::new(
            params.sphere_radius,
            params.sphere_density,
            params.gravity(),
        )
    }

    fn push_bc(&mut self, geom: BcGeom, tracked: bool) -> BcId {
        self.bcs.push(Bc {
            geom,
            tracked,
            enabled: true,
            reaction: Vector3::zeros(),
        });
        self.bcs.len() - 1
    }

    /// Current prescribed pose of each mesh soup.
    pub fn mesh_poses(&self) -> Vec<Isometry3<f64>> {
        self.meshes.iter().map(|m| m.pose).collect()
    }
}

impl GranularEngine for KinematicEngine {
    fn set_particles(&mut self, positions: &[Point3<f64>]) {
        self.particles = positions
            .iter()
            .map(|p| Particle {
                position: *p,
                velocity: Vector3::zeros(),
            })
            .collect();
    }

    fn create_bc_plane(
        &mut self,
        point: Point3<f64>,
        normal: Vector3<f64>,
        track_forces: bool,
    ) -> BcId {
        self.push_bc(
            BcGeom::Plane {
                point,
                normal: normal.normalize(),
            },
            track_forces,
        )
    }

    fn create_bc_cylinder_z(
        &mut self,
        center: Point3<f64>,
        radius: f64,
        track_forces: bool,
    ) -> BcId {
        self.push_bc(BcGeom::CylinderZ { center, radius }, track_forces)
    }

    fn create_bc_cone_z(
        &mut self,
        tip: Point3<f64>,
        slope: f64,
        hmax: f64,
        hmin: f64,
        track_forces: bool,
    ) -> BcId {
        self.push_bc(
            BcGeom::ConeZ {
                tip,
                slope,
                hmax,
                hmin,
            },
            track_forces,
        )
    }

    fn disable_bc(&mut self, id: BcId) {
        if let Some(bc) = self.bcs.get_mut(id) {
            bc.enabled = false;
        }
    }

    fn bc_reaction_force(&self, id: BcId) -> Option<Vector3<f64>> {
        let bc = self.bcs.get(id)?;
        if bc.tracked {
            Some(bc.reaction)
        } else {
            None
        }
    }

    fn load_meshes(&mut self, entries: &[MeshSoupEntry]) -> Result<()> {
        self.meshes = entries
            .iter()
            .map(|e| MeshState {
                pose: Isometry3::translation(e.translation.x, e.translation.y, e.translation.z),
                force: Vector3::zeros(),
                torque: Vector3::zeros(),
            })
            .collect();
        Ok(())
    }

    fn apply_mesh_motion(
        &mut self,
        index: usize,
        pose: Isometry3<f64>,
        _linear_velocity: Vector3<f64>,
        _angular_velocity: Vector3<f64>,
    ) {
        if let Some(mesh) = self.meshes.get_mut(index) {
            mesh.pose = pose;
        }
    }

    fn mesh_contact_force_torque(&self, index: usize) -> (Vector3<f64>, Vector3<f64>) {
        self.meshes
            .get(index)
            .map(|m| (m.force, m.torque))
            .unwrap_or((Vector3::zeros(), Vector3::zeros()))
    }

    fn initialize(&mut self) {
        self.initialized = true;
    }

    fn advance(&mut self, dt: f64) {
        debug_assert!(self.initialized, "advance called before initialize");
        for p in &mut self.particles {
            p.velocity += self.gravity * dt;
            p.position += p.velocity * dt;
        }

        let mass = self.sphere_mass;
        let gravity = self.gravity;
        let radius = self.sphere_radius;
        for bc in &mut self.bcs {
            bc.reaction = Vector3::zeros();
            if !bc.enabled {
                continue;
            }
            for p in &mut self.particles {
                if let Some(normal) = bc.geom.resolve(p, radius) {
                    if bc.tracked {
                        // Support force balancing the gravity component
                        // pressing the particle into this surface.
                        bc.reaction += normal * (mass * (-gravity.dot(&normal)).max(0.0));
                    }
                }
            }
        }

        self.steps += 1;
    }

    fn steps_completed(&self) -> u64 {
        self.steps
    }

    fn particle_positions(&self) -> Vec<Point3<f64>> {
        self.particles.iter().map(|p| p.position).collect()
    }

    fn particle_velocities(&self) -> Vec<Vector3<f64>> {
        self.particles.iter().map(|p| p.velocity).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_relative_eq, relative_eq};
    use nalgebra::point;

    fn gravity() -> Vector3<f64> {
        vector![0.0, 0.0, -980.0]
    }

    #[test]
    fn particle_settles_onto_a_tracked_plane() {
        let mut engine = KinematicEngine::new(1.0, 2.5, gravity());
        engine.set_particles(&[point![0.0, 0.0, 3.0]]);
        let floor = engine.create_bc_plane(point![0.0, 0.0, 0.0], vector![0.0, 0.0, 1.0], true);
        engine.initialize();

        for _ in 0..2_000 {
            engine.advance(1.0e-3);
        }

        let pos = engine.particle_positions()[0];
        assert_relative_eq!(pos.z, 1.0, epsilon = 1.0e-6);

        let force = engine.bc_reaction_force(floor).unwrap();
        let weight = 4.0 / 3.0 * std::f64::consts::PI * 2.5 * 980.0;
        assert_relative_eq!(force.z, weight, max_relative = 1.0e-9);
        assert_eq!(engine.steps_completed(), 2_000);
    }

    #[test]
    fn untracked_boundary_reports_no_force() {
        let mut engine = KinematicEngine::new(1.0, 2.5, gravity());
        engine.set_particles(&[point![0.0, 0.0, 1.5]]);
        let floor = engine.create_bc_plane(point![0.0, 0.0, 0.0], vector![0.0, 0.0, 1.0], false);
        engine.initialize();
        engine.advance(1.0e-3);
        assert!(engine.bc_reaction_force(floor).is_none());
        assert!(engine.bc_reaction_force(99).is_none());
    }

    #[test]
    fn disabled_plane_lets_particles_fall_through() {
        let mut engine = KinematicEngine::new(1.0, 2.5, gravity());
        engine.set_particles(&[point![0.0, 0.0, 1.2]]);
        let floor = engine.create_bc_plane(point![0.0, 0.0, 0.0], vector![0.0, 0.0, 1.0], true);
        engine.initialize();
        engine.disable_bc(floor);

        for _ in 0..500 {
            engine.advance(1.0e-3);
        }
        assert!(engine.particle_positions()[0].z < 0.0);
    }

    #[test]
    fn cylinder_confines_particles_radially() {
        let mut engine = KinematicEngine::new(0.5, 2.5, vector![100.0, 0.0, 0.0]);
        engine.set_particles(&[point![0.0, 0.0, 0.0]]);
        engine.create_bc_cylinder_z(point![0.0, 0.0, 0.0], 5.0, false);
        engine.initialize();

        for _ in 0..1_000 {
            engine.advance(1.0e-3);
        }
        let pos = engine.particle_positions()[0];
        let rr = (pos.x * pos.x + pos.y * pos.y).sqrt();
        assert!(relative_eq!(rr, 4.5, epsilon = 1.0e-9), "rr = {rr}");
    }

    #[test]
    fn cone_funnels_particles_toward_the_axis() {
        // Sideways gravity pushes the particle outward; the cone surface
        // limits the radial distance reachable at its height.
        let mut engine = KinematicEngine::new(0.5, 2.5, vector![50.0, 0.0, 0.0]);
        engine.set_particles(&[point![0.0, 0.0, 4.0]]);
        engine.create_bc_cone_z(point![0.0, 0.0, 0.0], 1.0, 10.0, 1.0, false);
        engine.initialize();

        for _ in 0..1_000 {
            engine.advance(1.0e-3);
        }
        let pos = engine.particle_positions()[0];
        let rr = (pos.x * pos.x + pos.y * pos.y).sqrt();
        assert!(rr <= 3.5 + 1.0e-9, "rr = {rr}");
    }
}
