#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    if let Err(err) = native::run() {
        eprintln!("deform_cli error: {err}");
        std::process::exit(1);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use deform_engine::MeshDeformationComponent;
    use deform_engine::geom::{
        ActorId, CollisionChannel, ConformOptions, FitToSplineOptions, LinearFloatCurve,
        MeshBuffers, MeshGeometry, NoiseOptions, NoiseType, Point3, PolylineSpline, Rotator,
        SelectionGenerator, Transform, TriangleCollider, Vec3,
    };
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::fmt::Write as _;
    use std::fs::{self, File};
    use std::io::{BufWriter, Write};
    use std::path::{Path, PathBuf};

    const USAGE: &str = "usage:
  deform_cli list
  deform_cli run <scenario> [--obj <path>] [--overwrite]
  deform_cli run <scenario|all> --out-dir <dir> [--overwrite]

`--out-dir` writes <scenario>.snap and <scenario>.obj per scenario;
without it the snapshot goes to stdout.";

    /// Parsed `run` invocation.
    struct RunRequest {
        scenarios: Vec<Scenario>,
        out_dir: Option<PathBuf>,
        obj_path: Option<PathBuf>,
        overwrite: bool,
    }

    pub fn run() -> Result<(), String> {
        let mut args = std::env::args().skip(1);
        match args.next().as_deref() {
            Some("list") => {
                for scenario in Scenario::ALL {
                    println!("{}", scenario.name());
                }
                Ok(())
            }
            Some("run") => execute(parse_run(args)?),
            None | Some("-h" | "--help" | "help") => {
                println!("{USAGE}");
                Ok(())
            }
            Some(other) => Err(format!("unknown command `{other}`\n{USAGE}")),
        }
    }

    fn parse_run(mut args: impl Iterator<Item = String>) -> Result<RunRequest, String> {
        let target = args.next().ok_or("missing scenario name")?;
        let mut request = RunRequest {
            scenarios: Scenario::resolve(&target)?,
            out_dir: None,
            obj_path: None,
            overwrite: false,
        };
        while let Some(flag) = args.next() {
            let slot = match flag.as_str() {
                "--overwrite" => {
                    request.overwrite = true;
                    continue;
                }
                "--out-dir" => &mut request.out_dir,
                "--obj" => &mut request.obj_path,
                other => return Err(format!("unknown option `{other}`\n{USAGE}")),
            };
            *slot = Some(args.next().map(PathBuf::from).ok_or_else(|| format!("{flag} needs a value"))?);
        }
        match (&request.out_dir, &request.obj_path) {
            (Some(_), Some(_)) => Err("--out-dir and --obj are exclusive".to_string()),
            (None, _) if request.scenarios.len() > 1 => Err("`run all` requires --out-dir".to_string()),
            _ => Ok(request),
        }
    }

    fn execute(request: RunRequest) -> Result<(), String> {
        for &scenario in &request.scenarios {
            let output = run_scenario(scenario)?;
            match &request.out_dir {
                Some(dir) => {
                    let snap = dir.join(format!("{}.snap", output.name));
                    let obj = dir.join(format!("{}.obj", output.name));
                    write_output(&snap, request.overwrite, |w| w.write_all(output.snapshot.as_bytes()))?;
                    write_output(&obj, request.overwrite, |w| write_obj(w, &output.mesh, output.name))?;
                    eprintln!("wrote {} and {}", snap.display(), obj.display());
                }
                None => {
                    print!("{}", output.snapshot);
                    if let Some(path) = &request.obj_path {
                        write_output(path, request.overwrite, |w| write_obj(w, &output.mesh, output.name))?;
                        eprintln!("wrote {}", path.display());
                    }
                }
            }
            eprintln!("{}: {}", output.name, output.mesh.summary());
        }
        Ok(())
    }

    /// Creates `path` (and its parent directories) and hands a buffered
    /// writer to `body`. Existing files are kept unless `overwrite`.
    fn write_output(
        path: &Path,
        overwrite: bool,
        body: impl FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
    ) -> Result<(), String> {
        let fail = |e: std::io::Error| format!("{}: {e}", path.display());
        if path.exists() && !overwrite {
            return Err(format!("{} exists; pass --overwrite to replace it", path.display()));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(fail)?;
        }
        let mut w = BufWriter::new(File::create(path).map_err(fail)?);
        body(&mut w).map_err(fail)?;
        w.flush().map_err(fail)
    }

    fn write_obj(w: &mut impl Write, mesh: &MeshGeometry, name: &str) -> std::io::Result<()> {
        writeln!(w, "# deform-engine deform_cli")?;
        writeln!(w, "o {name}")?;
        for p in mesh.positions() {
            writeln!(w, "v {} {} {}", p.x, p.y, p.z)?;
        }
        for uv in mesh.uv_channel(0).unwrap_or_default() {
            writeln!(w, "vt {} {}", uv[0], uv[1])?;
        }
        for n in mesh.normals() {
            writeln!(w, "vn {} {} {}", n.x, n.y, n.z)?;
        }
        for (i, section) in mesh.sections().iter().enumerate() {
            writeln!(w, "g section_{i}")?;
            for tri in section.triangles() {
                let [a, b, c] = tri.map(|v| v + 1);
                writeln!(w, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}")?;
            }
        }
        Ok(())
    }

    /// Six decimals, with negative zero folded so snapshots diff cleanly.
    fn coord(value: f64) -> String {
        let text = format!("{value:.6}");
        if text.trim_start_matches('-').bytes().all(|b| b == b'0' || b == b'.') {
            text.trim_start_matches('-').to_string()
        } else {
            text
        }
    }

    fn snapshot(op: &str, mesh: &MeshGeometry, extra: &str) -> String {
        let mut out = format!("# deform-engine snapshot\nop {op}\nmesh {}\n{extra}", mesh.summary());
        for p in mesh.positions() {
            let _ = writeln!(out, "v {} {} {}", coord(p.x), coord(p.y), coord(p.z));
        }
        out
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Scenario {
        TranslateFalloff,
        ScaleTriangle,
        SpherizeCube,
        NoiseJitter,
        ConformSlope,
        FitToArc,
        LerpToSphere,
    }

    impl Scenario {
        const ALL: &'static [Scenario] = &[
            Scenario::TranslateFalloff,
            Scenario::ScaleTriangle,
            Scenario::SpherizeCube,
            Scenario::NoiseJitter,
            Scenario::ConformSlope,
            Scenario::FitToArc,
            Scenario::LerpToSphere,
        ];

        fn name(self) -> &'static str {
            match self {
                Scenario::TranslateFalloff => "translate_falloff",
                Scenario::ScaleTriangle => "scale_triangle",
                Scenario::SpherizeCube => "spherize_cube",
                Scenario::NoiseJitter => "noise_jitter",
                Scenario::ConformSlope => "conform_slope",
                Scenario::FitToArc => "fit_to_arc",
                Scenario::LerpToSphere => "lerp_to_sphere",
            }
        }

        fn resolve(target: &str) -> Result<Vec<Self>, String> {
            if target == "all" {
                return Ok(Scenario::ALL.to_vec());
            }
            Scenario::ALL
                .iter()
                .copied()
                .find(|s| s.name() == target)
                .map(|s| vec![s])
                .ok_or_else(|| {
                    let names: Vec<&str> = Scenario::ALL.iter().map(|s| s.name()).collect();
                    format!("unknown scenario `{target}` (expected one of: {})", names.join(", "))
                })
        }
    }

    struct ScenarioOutput {
        name: &'static str,
        mesh: MeshGeometry,
        snapshot: String,
    }

    fn run_scenario(scenario: Scenario) -> Result<ScenarioOutput, String> {
        let name = scenario.name();
        let mut extra = String::new();
        let mut component = MeshDeformationComponent::new();

        match scenario {
            Scenario::TranslateFalloff => {
                component.load_from_buffers(grid_buffers(9, 1.0)).map_err(|e| e.to_string())?;
                let near = component
                    .select(&SelectionGenerator::Near {
                        center: Point3::new(4.0, 4.0, 0.0),
                        inner_radius: 1.0,
                        outer_radius: 4.0,
                    })
                    .map_err(|e| e.to_string())?;
                let _ = writeln!(extra, "selected {}", near.selected_count());
                component
                    .translate(Vec3::new(0.0, 0.0, 2.0), Some(&near))
                    .and_then(|c| c.recompute_normals())
                    .map_err(|e| e.to_string())?;
            }
            Scenario::ScaleTriangle => {
                let triangle = MeshBuffers::new(
                    vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                    vec![vec![0, 1, 2]],
                )
                .with_uv_channel(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
                component.load_from_buffers(triangle).map_err(|e| e.to_string())?;
                component
                    .scale(Vec3::splat(2.0), Point3::ORIGIN, None)
                    .map_err(|e| e.to_string())?;
            }
            Scenario::SpherizeCube => {
                component.load_from_buffers(cube_buffers(4)).map_err(|e| e.to_string())?;
                component
                    .spherize(1.5, 1.0, Point3::ORIGIN, None)
                    .and_then(|c| c.rotate(Rotator::new(0.0, 45.0, 0.0), Point3::ORIGIN, None))
                    .map_err(|e| e.to_string())?;
            }
            Scenario::NoiseJitter => {
                component.load_from_buffers(grid_buffers(12, 0.5)).map_err(|e| e.to_string())?;
                let noise = component
                    .select_by_noise(
                        Transform::identity(),
                        NoiseOptions::new(NoiseType::PerlinFractal, 7, 0.4),
                    )
                    .map_err(|e| e.to_string())?;
                let mut rng = StdRng::seed_from_u64(0xdef0);
                component
                    .jitter(&mut rng, Vec3::new(0.0, 0.0, -0.2), Vec3::new(0.0, 0.0, 0.6), Some(&noise))
                    .map_err(|e| e.to_string())?;
            }
            Scenario::ConformSlope => {
                component.load_from_buffers(grid_buffers(6, 1.0)).map_err(|e| e.to_string())?;
                let mut world = TriangleCollider::new();
                let ground = [
                    Point3::new(-20.0, -20.0, -10.0),
                    Point3::new(20.0, -20.0, -2.0),
                    Point3::new(20.0, 20.0, -2.0),
                    Point3::new(-20.0, 20.0, -10.0),
                ];
                world
                    .add_triangles(
                        ActorId(1),
                        &[CollisionChannel::WorldStatic],
                        &ground,
                        &[[0, 1, 2], [0, 2, 3]],
                    )
                    .map_err(|e| e.to_string())?;
                let report = component
                    .conform(&world, &ConformOptions::default().with_height_adjust(0.25), None)
                    .map_err(|e| e.to_string())?;
                let _ = writeln!(
                    extra,
                    "conform traced={} hits={} misses={}",
                    report.traced, report.hits, report.misses
                );
            }
            Scenario::FitToArc => {
                component.load_from_buffers(grid_buffers(8, 1.0)).map_err(|e| e.to_string())?;
                let arc: Vec<Point3> = (0..=16)
                    .map(|i| {
                        let t = f64::from(i) / 16.0 * std::f64::consts::FRAC_PI_2;
                        Point3::new(20.0 * t.sin(), 20.0 * (1.0 - t.cos()), 0.0)
                    })
                    .collect();
                let spline = PolylineSpline::new(arc).map_err(|e| e.to_string())?;
                let taper = LinearFloatCurve::new([(0.0, 1.0), (1.0, 0.25)]).map_err(|e| e.to_string())?;
                let options = FitToSplineOptions::default().with_section_profile(&taper);
                component
                    .fit_to_spline(&spline, &options, None)
                    .map_err(|e| e.to_string())?;
            }
            Scenario::LerpToSphere => {
                component.load_from_buffers(cube_buffers(3)).map_err(|e| e.to_string())?;
                let mut sphere = MeshDeformationComponent::new();
                sphere
                    .load_from_buffers(cube_buffers(3))
                    .and_then(|c| c.spherize(1.0, 1.0, Point3::ORIGIN, None))
                    .map_err(|e| e.to_string())?;
                let gradient = component
                    .select_linear(Point3::new(-1.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0), false, true)
                    .map_err(|e| e.to_string())?;
                component
                    .lerp(&sphere, 1.0, Some(&gradient))
                    .map_err(|e| e.to_string())?;
            }
        }

        let mesh = component
            .take_geometry()
            .ok_or_else(|| format!("{name}: no geometry"))?;
        let snapshot = snapshot(name, &mesh, &extra);
        Ok(ScenarioOutput {
            name,
            mesh,
            snapshot,
        })
    }

    /// `n x n` vertices on z = 0 with the given spacing.
    fn grid_buffers(n: u32, spacing: f64) -> MeshBuffers {
        let mut positions = Vec::new();
        let mut uvs = Vec::new();
        let step = 1.0 / f64::from(n - 1);
        for y in 0..n {
            for x in 0..n {
                positions.push([f64::from(x) * spacing, f64::from(y) * spacing, 0.0]);
                uvs.push([f64::from(x) * step, f64::from(y) * step]);
            }
        }
        let mut indices = Vec::new();
        for y in 0..n - 1 {
            for x in 0..n - 1 {
                let i = y * n + x;
                indices.extend_from_slice(&[i, i + 1, i + n + 1, i, i + n + 1, i + n]);
            }
        }
        MeshBuffers::new(positions, vec![indices]).with_uv_channel(uvs)
    }

    /// Cube spanning [-1, 1] with each face split into `n x n` quads and its
    /// own section. Face vertices are not shared.
    fn cube_buffers(n: u32) -> MeshBuffers {
        let faces: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::X, Vec3::Y, Vec3::Z),
            (-Vec3::X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::Z, Vec3::X),
            (-Vec3::Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (-Vec3::Z, Vec3::Y, Vec3::X),
        ];
        let mut positions = Vec::new();
        let mut uvs = Vec::new();
        let mut sections = Vec::new();
        let step = 1.0 / f64::from(n);

        for (normal, u_axis, v_axis) in faces {
            let base = positions.len() as u32;
            for j in 0..=n {
                for i in 0..=n {
                    let (u, v) = (f64::from(i) * step, f64::from(j) * step);
                    let p = normal + u_axis * (2.0 * u - 1.0) + v_axis * (2.0 * v - 1.0);
                    positions.push(p.to_array());
                    uvs.push([u, v]);
                }
            }
            let mut indices = Vec::new();
            for j in 0..n {
                for i in 0..n {
                    let a = base + j * (n + 1) + i;
                    let (b, c, d) = (a + 1, a + n + 2, a + n + 1);
                    indices.extend_from_slice(&[a, b, c, a, c, d]);
                }
            }
            sections.push(indices);
        }

        MeshBuffers::new(positions, sections).with_uv_channel(uvs)
    }

}
