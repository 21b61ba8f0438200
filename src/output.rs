//! Run outputs: trajectory frames, displacement dumps and scalar logs.

use std::fmt::Display;
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use color_eyre::eyre::{Result, WrapErr};
use nalgebra::Vector3;

use crate::molecules::Molecules;

/// Sweep indices at which full frames are dumped: every linear block start
/// (multiples of `linear`) plus a log-spaced ladder inside each block, and
/// the last step itself. The ladder grows by i <- floor(i * log_scalar) + 1.
pub fn create_save_times(max: usize, linear: usize, log_scalar: f64) -> Vec<usize> {
    let mut times = Vec::new();
    let mut block = 0;
    while block < max {
        times.push(block);
        times.push(block + 1);
        let mut i = log_scalar as usize + 1;
        while i < linear {
            times.push(block + i);
            i = (i as f64 * log_scalar) as usize + 1;
        }
        block += linear;
    }
    times.push(max);
    times.dedup();
    times
}

/// Owns the run folder layout (`outXYZ/`, `disp/`, the scalar logs) and the
/// save schedule. All files are append-only within a run; frames are one file
/// per saved step, named by the step label.
pub struct RunRecorder {
    folder: PathBuf,
    save_times: Vec<usize>,
    save_index: usize,
    time_steps: usize,
}

impl RunRecorder {
    pub fn create(folder: impl Into<PathBuf>, time_steps: usize, save_update: usize) -> Result<Self> {
        let folder = folder.into();
        create_dir_all(folder.join("outXYZ"))
            .wrap_err_with(|| format!("unable to create {}/outXYZ", folder.display()))?;
        create_dir_all(folder.join("disp"))
            .wrap_err_with(|| format!("unable to create {}/disp", folder.display()))?;
        Ok(RunRecorder {
            save_times: create_save_times(time_steps, save_update, 1.1),
            save_index: 0,
            folder,
            time_steps,
        })
    }

    /// State before the first sweep: frame 0, displacement 0 and the first
    /// energy sample.
    pub fn record_initial(
        &mut self,
        system: &Molecules,
        energy_per_particle: f64,
        total_displacements: &[Vector3<f64>],
    ) -> Result<()> {
        self.write_frame(0, system)?;
        self.write_displacements(0, total_displacements)?;
        self.append_line("outE.txt", energy_per_particle)
    }

    /// Per-sweep bookkeeping: scheduled frames (labeled step + 1), the energy
    /// log every 50 sweeps and the pressure log when enabled.
    pub fn record_sweep(
        &mut self,
        step: usize,
        system: &Molecules,
        total_displacements: &[Vector3<f64>],
        energy_per_particle: f64,
        pressure: Option<f64>,
    ) -> Result<()> {
        while self.save_index < self.save_times.len() && self.save_times[self.save_index] <= step {
            if self.save_times[self.save_index] == step {
                self.write_frame(step + 1, system)?;
                self.write_displacements(step + 1, total_displacements)?;
            }
            self.save_index += 1;
        }
        if step % 50 == 0 {
            self.append_line("outE.txt", energy_per_particle)?;
        }
        if let Some(pressure) = pressure {
            self.append_line("outP.txt", pressure)?;
        }
        Ok(())
    }

    /// Final frame plus the neighbor-audit error count.
    pub fn record_final(
        &mut self,
        system: &Molecules,
        total_displacements: &[Vector3<f64>],
        errors: u64,
    ) -> Result<()> {
        self.write_frame(self.time_steps, system)?;
        self.write_displacements(self.time_steps, total_displacements)?;
        self.append_line("errors.txt", errors)
    }

    /// Extended-XYZ frame: particle count, lattice plus column layout, then
    /// one `molecule_type particle_type x y z` row per particle.
    fn write_frame(&self, label: usize, system: &Molecules) -> Result<()> {
        let path = self.folder.join("outXYZ").join(format!("position{label}.xyz"));
        let file =
            File::create(&path).wrap_err_with(|| format!("unable to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", system.n_particles())?;
        let length = system.cell().length();
        writeln!(
            writer,
            "Lattice=\"{length} 0.0 0.0 0.0 {length} 0.0 0.0 0.0 {length}\" \
             Properties=molecule_type:S:1:type:I:1:pos:R:3:"
        )?;
        for i in 0..system.n_particles() {
            let position = system.position(i);
            writeln!(
                writer,
                "{} {} {} {} {}",
                system.molecule_type(i),
                system.particle_type(i),
                position.x,
                position.y,
                position.z
            )?;
        }
        Ok(())
    }

    fn write_displacements(&self, label: usize, displacements: &[Vector3<f64>]) -> Result<()> {
        let path = self
            .folder
            .join("disp")
            .join(format!("displacement{label}.txt"));
        let file =
            File::create(&path).wrap_err_with(|| format!("unable to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        for displacement in displacements {
            writeln!(
                writer,
                "{} {} {}",
                displacement.x, displacement.y, displacement.z
            )?;
        }
        Ok(())
    }

    fn append_line(&self, name: &str, value: impl Display) -> Result<()> {
        let path = self.folder.join(name);
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .wrap_err_with(|| format!("unable to open {}", path.display()))?;
        writeln!(file, "{}", value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Box3;
    use std::fs;

    #[test]
    fn test_save_times_ladder() {
        let times = create_save_times(50, 50, 1.1);
        assert_eq!(
            times,
            vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 12, 14, 16, 18, 20, 23, 26, 29, 32, 36, 40, 45, 50]
        );
    }

    #[test]
    fn test_save_times_monotonic_and_bounded() {
        let times = create_save_times(1000, 100, 1.1);
        assert_eq!(times[0], 0);
        assert_eq!(*times.last().unwrap(), 1000);
        assert!(times.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_save_times_small_linear_block() {
        // A save cadence of one degenerates to every step without duplicates.
        let times = create_save_times(4, 1, 1.1);
        assert_eq!(times, vec![0, 1, 2, 3, 4]);
    }

    fn tiny_system() -> Molecules {
        Molecules::new(
            Box3::new(10.0),
            vec![Vector3::new(1.0, 2.0, 3.0), Vector3::new(4.0, 5.0, 6.0)],
            vec![1.0, 1.0],
            vec![1, 1],
            vec![2, 3],
            None,
        )
    }

    #[test]
    fn test_recorder_layout_and_frames() {
        let dir = tempfile::tempdir().unwrap();
        let system = tiny_system();
        let displacements = vec![Vector3::zeros(); 2];

        let mut recorder = RunRecorder::create(dir.path(), 3, 1).unwrap();
        recorder
            .record_initial(&system, -1.25, &displacements)
            .unwrap();
        for step in 0..3 {
            recorder
                .record_sweep(step, &system, &displacements, -1.25, Some(0.5))
                .unwrap();
        }
        recorder.record_final(&system, &displacements, 0).unwrap();

        let frame = fs::read_to_string(dir.path().join("outXYZ/position0.xyz")).unwrap();
        let mut lines = frame.lines();
        assert_eq!(lines.next().unwrap(), "2");
        let header = lines.next().unwrap();
        assert!(header.starts_with("Lattice=\"10 0.0 0.0 0.0 10 0.0 0.0 0.0 10\""));
        assert!(header.ends_with("Properties=molecule_type:S:1:type:I:1:pos:R:3:"));
        assert_eq!(lines.next().unwrap(), "1 2 1 2 3");

        // Steps 0..2 save frames labeled 1..3, the final frame reuses label 3.
        for label in [0, 1, 2, 3] {
            assert!(dir
                .path()
                .join(format!("outXYZ/position{label}.xyz"))
                .exists());
            assert!(dir
                .path()
                .join(format!("disp/displacement{label}.txt"))
                .exists());
        }

        // Initial sample plus the step-0 sample.
        let energies = fs::read_to_string(dir.path().join("outE.txt")).unwrap();
        assert_eq!(energies.lines().count(), 2);
        let pressures = fs::read_to_string(dir.path().join("outP.txt")).unwrap();
        assert_eq!(pressures.lines().count(), 3);
        let errors = fs::read_to_string(dir.path().join("errors.txt")).unwrap();
        assert_eq!(errors.trim(), "0");
    }
}
