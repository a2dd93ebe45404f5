use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::Path;
use std::sync::atomic::Ordering::Relaxed;
use tempfile::TempDir;

use polyaug::augment::process_image;
use polyaug::label::read_polygons;
use polyaug::{run, Args, Pipeline, ProcessingStats, TransformKind, TransformStep};

struct TestDirs {
    _root: TempDir,
    args: Args,
}

fn setup_dirs(num_augmentations: usize) -> TestDirs {
    let root = tempfile::tempdir().unwrap();
    let image_dir = root.path().join("images");
    let label_dir = root.path().join("labels");
    let out_image_dir = root.path().join("aug_images");
    let out_label_dir = root.path().join("aug_labels");
    for dir in [&image_dir, &label_dir, &out_image_dir, &out_label_dir] {
        fs::create_dir_all(dir).unwrap();
    }

    let args = Args {
        image_dir: image_dir.to_string_lossy().into_owned(),
        label_dir: label_dir.to_string_lossy().into_owned(),
        output_image_dir: Some(out_image_dir.to_string_lossy().into_owned()),
        output_label_dir: Some(out_label_dir.to_string_lossy().into_owned()),
        num_augmentations,
        seed: 42,
        workers: 2,
        image_ext: "png".to_string(),
    };
    TestDirs { _root: root, args }
}

fn write_test_image(path: &Path, width: u32, height: u32) {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    image.save(path).unwrap();
}

fn flip_only_pipeline() -> Pipeline {
    Pipeline::new(vec![TransformStep {
        kind: TransformKind::HorizontalFlip,
        probability: 1.0,
    }])
}

#[test]
fn test_forced_flip_scenario() {
    let dirs = setup_dirs(1);
    let args = &dirs.args;

    let image_path = Path::new(&args.image_dir).join("sample.png");
    write_test_image(&image_path, 640, 480);
    fs::write(
        Path::new(&args.label_dir).join("sample.txt"),
        "0 0.100000 0.100000 0.900000 0.100000 0.900000 0.900000\n",
    )
    .unwrap();

    let stats = ProcessingStats::new();
    let mut rng = StdRng::seed_from_u64(42);
    process_image(&image_path, args, &flip_only_pipeline(), &mut rng, &stats);

    let out_label = Path::new(args.output_label_dir()).join("sample_aug0.txt");
    let polygons = read_polygons(&out_label, &stats);
    assert_eq!(polygons.len(), 1);
    assert_eq!(polygons[0].class_id, 0);

    let expected = [(0.9, 0.1), (0.1, 0.1), (0.1, 0.9)];
    assert_eq!(polygons[0].points.len(), expected.len());
    for (&(x, y), &(ex, ey)) in polygons[0].points.iter().zip(&expected) {
        assert!((x - ex).abs() < 1e-6, "x {} vs {}", x, ex);
        assert!((y - ey).abs() < 1e-6, "y {} vs {}", y, ey);
    }

    // image is mirrored left-right
    let source = image::open(&image_path).unwrap().to_rgb8();
    let flipped = image::open(Path::new(args.output_image_dir()).join("sample_aug0.png"))
        .unwrap()
        .to_rgb8();
    assert_eq!(flipped.dimensions(), (640, 480));
    assert_eq!(flipped.get_pixel(0, 0), source.get_pixel(639, 0));
}

#[test]
fn test_output_cardinality() {
    let dirs = setup_dirs(3);
    let args = &dirs.args;

    let image_path = Path::new(&args.image_dir).join("card.png");
    write_test_image(&image_path, 64, 48);
    fs::write(
        Path::new(&args.label_dir).join("card.txt"),
        "1 0.2 0.2 0.8 0.2 0.5 0.8\n",
    )
    .unwrap();

    let stats = ProcessingStats::new();
    let mut rng = StdRng::seed_from_u64(7);
    process_image(&image_path, args, &Pipeline::default(), &mut rng, &stats);

    for i in 0..3 {
        assert!(Path::new(args.output_image_dir())
            .join(format!("card_aug{i}.png"))
            .exists());
        assert!(Path::new(args.output_label_dir())
            .join(format!("card_aug{i}.txt"))
            .exists());
    }
    assert_eq!(stats.outputs_written.load(Relaxed), 3);
    assert_eq!(stats.images_augmented.load(Relaxed), 1);
}

#[test]
fn test_point_count_invariance() {
    let dirs = setup_dirs(4);
    let args = &dirs.args;

    let image_path = Path::new(&args.image_dir).join("inv.png");
    write_test_image(&image_path, 100, 80);
    fs::write(
        Path::new(&args.label_dir).join("inv.txt"),
        "0 0.1 0.1 0.9 0.1 0.9 0.9 0.1 0.9\n2 0.4 0.4 0.6 0.4 0.5 0.6\n",
    )
    .unwrap();

    let stats = ProcessingStats::new();
    let mut rng = StdRng::seed_from_u64(99);
    process_image(&image_path, args, &Pipeline::default(), &mut rng, &stats);

    for i in 0..4 {
        let out_label = Path::new(args.output_label_dir()).join(format!("inv_aug{i}.txt"));
        let polygons = read_polygons(&out_label, &stats);
        assert_eq!(polygons.len(), 2);
        assert_eq!(polygons[0].class_id, 0);
        assert_eq!(polygons[0].points.len(), 4);
        assert_eq!(polygons[1].class_id, 2);
        assert_eq!(polygons[1].points.len(), 3);
        // persisted coordinates are clipped into [0, 1]
        for polygon in &polygons {
            for &(x, y) in &polygon.points {
                assert!((0.0..=1.0).contains(&x));
                assert!((0.0..=1.0).contains(&y));
            }
        }
    }
}

#[test]
fn test_missing_label_skips_image() {
    let dirs = setup_dirs(3);
    let args = &dirs.args;

    let image_path = Path::new(&args.image_dir).join("orphan.png");
    write_test_image(&image_path, 32, 32);

    let stats = ProcessingStats::new();
    let mut rng = StdRng::seed_from_u64(1);
    process_image(&image_path, args, &Pipeline::default(), &mut rng, &stats);

    assert_eq!(stats.skipped_missing_label.load(Relaxed), 1);
    assert_eq!(stats.outputs_written.load(Relaxed), 0);
    assert_eq!(fs::read_dir(args.output_image_dir()).unwrap().count(), 0);
    assert_eq!(fs::read_dir(args.output_label_dir()).unwrap().count(), 0);
}

#[test]
fn test_unreadable_image_skips_image() {
    let dirs = setup_dirs(2);
    let args = &dirs.args;

    let image_path = Path::new(&args.image_dir).join("broken.png");
    fs::write(&image_path, b"not an image").unwrap();
    fs::write(
        Path::new(&args.label_dir).join("broken.txt"),
        "0 0.1 0.1 0.2 0.2\n",
    )
    .unwrap();

    let stats = ProcessingStats::new();
    let mut rng = StdRng::seed_from_u64(1);
    process_image(&image_path, args, &Pipeline::default(), &mut rng, &stats);

    assert_eq!(stats.skipped_unreadable_image.load(Relaxed), 1);
    assert_eq!(stats.outputs_written.load(Relaxed), 0);
}

#[test]
fn test_malformed_label_treated_as_empty() {
    let dirs = setup_dirs(2);
    let args = &dirs.args;

    let image_path = Path::new(&args.image_dir).join("bad.png");
    write_test_image(&image_path, 16, 16);
    fs::write(
        Path::new(&args.label_dir).join("bad.txt"),
        "0 0.1 0.2 0.3\n",
    )
    .unwrap();

    let stats = ProcessingStats::new();
    let mut rng = StdRng::seed_from_u64(1);
    process_image(&image_path, args, &Pipeline::default(), &mut rng, &stats);

    // lossy recovery: the image is still augmented, with empty label files
    assert_eq!(stats.malformed_label_files.load(Relaxed), 1);
    assert_eq!(stats.outputs_written.load(Relaxed), 2);
    for i in 0..2 {
        let out_label = Path::new(args.output_label_dir()).join(format!("bad_aug{i}.txt"));
        assert_eq!(fs::read_to_string(out_label).unwrap(), "");
    }
}

#[test]
fn test_empty_batch_completes_without_error() {
    let dirs = setup_dirs(3);
    assert!(run(&dirs.args).is_ok());
    assert_eq!(
        fs::read_dir(dirs.args.output_image_dir()).unwrap().count(),
        0
    );
}

#[test]
fn test_run_full_batch() {
    let dirs = setup_dirs(2);
    let args = &dirs.args;

    for name in ["a", "b", "c"] {
        write_test_image(&Path::new(&args.image_dir).join(format!("{name}.png")), 40, 30);
        fs::write(
            Path::new(&args.label_dir).join(format!("{name}.txt")),
            "0 0.25 0.25 0.75 0.25 0.5 0.75\n",
        )
        .unwrap();
    }
    // one image without a label; the batch must still complete
    write_test_image(&Path::new(&args.image_dir).join("orphan.png"), 40, 30);

    assert!(run(args).is_ok());

    let image_outputs = fs::read_dir(args.output_image_dir()).unwrap().count();
    let label_outputs = fs::read_dir(args.output_label_dir()).unwrap().count();
    assert_eq!(image_outputs, 6);
    assert_eq!(label_outputs, 6);
    assert!(!Path::new(args.output_image_dir())
        .join("orphan_aug0.png")
        .exists());
}
