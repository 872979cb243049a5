//! Subcommand implementations.

use tracing::info;
use triad_data::Container;
use triad_export::PointCloudConfig;
use triad_export::export::{
    PlyMeshSet, RenderOptions, collect_camera_poses, generate_point_cloud, get_mesh_from_filename,
    render_trajectory, save_trajectory_images, write_camera_poses,
};

use crate::error::{AppError, Result};
use crate::progress::IndicatifProgress;
use crate::synthetic::{OrbitDataManager, ShellRaySource, SphereField};
use crate::{InspectArgs, MeshArgs, PointCloudArgs, PosesArgs, RenderArgs, SceneArgs};

/// Demo point budget when neither the config file nor the flags set one.
const DEFAULT_DEMO_POINTS: usize = 4096;

impl SceneArgs {
    fn field(&self) -> SphereField {
        SphereField::new(self.radius)
    }

    fn data_manager(&self) -> OrbitDataManager {
        OrbitDataManager::new(
            self.cameras,
            self.eval_cameras,
            self.radius * 4.0,
            self.width,
            self.height,
        )
    }
}

impl PointCloudArgs {
    /// Config file (or defaults) with the command line flags applied on top.
    fn config(&self) -> Result<PointCloudConfig> {
        let mut config = match &self.config {
            Some(path) => PointCloudConfig::from_json_file(path)?,
            None => PointCloudConfig {
                num_points: DEFAULT_DEMO_POINTS,
                ..Default::default()
            },
        };
        if let Some(num_points) = self.num_points {
            config.num_points = num_points;
        }
        if let Some(output) = &self.output {
            config.container_path = output.clone();
        }
        if self.keep_outliers {
            config.remove_outliers = false;
        }
        if self.estimate_normals {
            config.estimate_normals = true;
        }
        if let Some(name) = &self.normal_output_name {
            config.normal_output_name = Some(name.clone());
        }
        if let Some(std_ratio) = self.std_ratio {
            config.std_ratio = std_ratio;
        }
        Ok(config)
    }
}

pub fn pointcloud(args: PointCloudArgs) -> Result<()> {
    if args.batch_size == 0 {
        return Err(AppError::InvalidArgument("batch size must be positive".to_string()));
    }
    let config = args.config()?;
    let field = args.scene.field();
    let mut source = ShellRaySource::new(args.batch_size, &field);

    let cloud = generate_point_cloud(&mut source, &field, &config, &mut IndicatifProgress::new())?;
    info!(
        "Exported {} points{} (raw samples in {})",
        cloud.len(),
        if cloud.has_normals() { " with normals" } else { "" },
        config.container_path.display()
    );
    Ok(())
}

pub fn render(args: RenderArgs) -> Result<()> {
    let field = args.scene.field();
    let manager = args.scene.data_manager();
    let options = RenderOptions {
        rendered_resolution_scaling_factor: args.scale,
        disable_distortion: args.disable_distortion,
        ..Default::default()
    };

    let rendered = render_trajectory(
        &field,
        manager.train_cameras(),
        &options,
        &mut IndicatifProgress::new(),
    )?;
    save_trajectory_images(&args.output_dir, &rendered)?;
    Ok(())
}

pub fn poses(args: PosesArgs) -> Result<()> {
    let manager = args.scene.data_manager();
    let (train, eval) = collect_camera_poses(&manager);

    std::fs::create_dir_all(&args.output_dir)?;
    write_camera_poses(&args.output_dir.join("transforms_train.json"), &train)?;
    write_camera_poses(&args.output_dir.join("transforms_eval.json"), &eval)?;
    Ok(())
}

pub fn mesh(args: MeshArgs) -> Result<()> {
    let mesh = get_mesh_from_filename(&mut PlyMeshSet::new(), &args.file, args.target_faces)?;
    info!(
        "Mesh: {} vertices, {} faces, {} normals, colors: {}",
        mesh.num_vertices(),
        mesh.num_faces(),
        mesh.normals.len(),
        if mesh.colors.is_some() { "yes" } else { "no" }
    );
    Ok(())
}

pub fn inspect(args: InspectArgs) -> Result<()> {
    let container = Container::open(&args.file)?;
    println!("{} (version {})", args.file.display(), container.version);
    for group in &container.groups {
        println!("{}/", group.name);
        for dataset in &group.datasets {
            println!("  {} {:?}", dataset.name, dataset.shape);
        }
    }
    Ok(())
}
