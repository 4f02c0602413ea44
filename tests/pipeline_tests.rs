//! 事件流水线集成测试
//!
//! 验证通道过滤、ROI基线扣除与电荷重分配在完整事件上的行为，
//! 以及配置 / 标定表加载的错误路径。

use std::fs;
use tempfile::tempdir;
use uboone_roi_toolkit::core::calibration::ChannelMap;
use uboone_roi_toolkit::core::parameters::geometry::{A_T, A_W, C_T, C_Y};
use uboone_roi_toolkit::core::scale::{ScaleModelConfig, ScaleTables};
use uboone_roi_toolkit::event::{EnergyDeposit, Point3, RawDigit, Roi, Wire};
use uboone_roi_toolkit::{
    Event, EventProcessor, PipelineConfig, Plane, RoiError, RoiKey, ScaleModel, ScaleValues,
    Stage, SubRoiKey,
};

fn log(msg_zh: impl AsRef<str>, msg_en: impl AsRef<str>) {
    println!("{} / {}", msg_zh.as_ref(), msg_en.as_ref());
}

const Z: f64 = 300.0;

fn y_channel() -> u32 {
    (A_W * Z + C_Y).round() as u32
}

fn deposit_at_tick(tick: f64, energy: f64) -> EnergyDeposit {
    EnergyDeposit {
        x: (tick - C_T) / A_T,
        y: 10.0,
        z: Z,
        track_id: 3,
        energy,
        num_electrons: 0.0,
        step_start: Point3::new(0.0, 0.0, 0.0),
        step_end: Point3::new(0.1, 0.0, 0.3),
        step_length: 0.3,
    }
}

fn pulse_wire(begin: usize) -> Wire {
    let data = (0..21)
        .map(|i| {
            let x = (i as f32 - 10.0) / 3.0;
            40.0 * (-0.5 * x * x).exp()
        })
        .collect();
    Wire::new(y_channel(), vec![Roi::new(begin, data)])
}

fn overall_model(values: ScaleValues) -> ScaleModel {
    let config = ScaleModelConfig {
        apply_overall_scale: true,
        ..ScaleModelConfig::disabled()
    };
    let tables = ScaleTables {
        overall: Some([values; 3]),
        ..ScaleTables::default()
    };
    ScaleModel::from_config(&config, &tables).expect("overall 缩放模型应可构建")
}

// ========== 通道质量过滤 ==========

#[test]
fn test_filter_rejects_noisy_channels() {
    let quiet = RawDigit {
        channel: 5000,
        adcs: (0..128).map(|i| 400 + (i % 2) as i16).collect(),
    };
    let noisy = RawDigit {
        channel: 5001,
        adcs: (0..128).map(|i| if i % 2 == 0 { 380 } else { 420 }).collect(),
    };
    let out_of_range = RawDigit {
        channel: 90_000,
        adcs: vec![400; 16],
    };
    let event = Event {
        raw_digits: vec![quiet.clone(), noisy, out_of_range],
        ..Event::default()
    };

    let processor = EventProcessor::new(PipelineConfig::default(), ScaleModel::identity())
        .expect("默认配置应有效");
    let processed = processor
        .process_event(event, Stage::Filter)
        .expect("过滤阶段应成功");

    // 通过的波形原样保留
    assert_eq!(processed.event.raw_digits, vec![quiet]);

    let filter = processed.report.filter.expect("应有过滤报告");
    assert_eq!(filter.skipped, 1);
    assert_eq!(filter.rejected.len(), 1);
    assert_eq!(filter.rejected[0].channel, 5001);
    assert!((filter.rejected[0].truncated_rms - 20.0).abs() < 1e-9);

    let y = &filter.planes[2];
    assert_eq!((y.examined, y.accepted, y.rejected), (2, 1, 1));
    log(
        format!("Y 平面: 检查 {}，剔除 {}", y.examined, y.rejected),
        format!("Y plane: examined {}, rejected {}", y.examined, y.rejected),
    );
}

#[test]
fn test_rms_cut_is_per_plane() {
    // 截断RMS ≈ 7：U 平面阈值 10 保留，Y 平面阈值 5 剔除
    let adcs: Vec<i16> = (0..100).map(|i| if i % 2 == 0 { 2041 } else { 2055 }).collect();
    let event = Event {
        raw_digits: vec![
            RawDigit {
                channel: 100,
                adcs: adcs.clone(),
            },
            RawDigit {
                channel: 6000,
                adcs,
            },
        ],
        ..Event::default()
    };

    let processor = EventProcessor::new(PipelineConfig::default(), ScaleModel::identity())
        .expect("默认配置应有效");
    let processed = processor.process_event(event, Stage::Filter).expect("过滤阶段应成功");

    let kept: Vec<u32> = processed.event.raw_digits.iter().map(|d| d.channel).collect();
    assert_eq!(kept, vec![100]);
}

// ========== 基线扣除 ==========

#[test]
fn test_baseline_stage_subtracts_mode_average() {
    let event = Event {
        wires: vec![Wire::new(
            5000,
            vec![Roi::new(100, vec![10.0, 10.0, 10.0, 11.0, 11.0, 9.0])],
        )],
        ..Event::default()
    };
    let processor = EventProcessor::new(PipelineConfig::default(), ScaleModel::identity())
        .expect("默认配置应有效");
    let processed = processor.process_event(event, Stage::Baseline).expect("基线阶段应成功");

    // Y 平面噪声 2 × 1.26491 覆盖全部样本 → 基线 61/6
    let baseline = processed.report.baselines[0].baseline;
    assert!((baseline - 61.0 / 6.0).abs() < 1e-5);
    let data = &processed.event.wires[0].rois[0].data;
    assert!((data[0] - (10.0 - 61.0 / 6.0)).abs() < 1e-5);
    log(
        format!("ROI 基线 {baseline:.4} 已扣除"),
        format!("ROI baseline {baseline:.4} subtracted"),
    );
}

/// 把所有通道归入收集面的简化布局
struct CollectionOnly;

impl ChannelMap for CollectionOnly {
    fn plane_of(&self, channel: u32) -> Option<Plane> {
        (channel < 64).then_some(Plane::Y)
    }

    fn num_channels(&self) -> u32 {
        64
    }

    fn channel_range(&self, plane: Plane) -> (u32, u32) {
        match plane {
            Plane::Y => (0, 64),
            _ => (0, 0),
        }
    }
}

#[test]
fn test_injected_channel_map_drives_calibration() {
    // 默认布局下通道 3 属于 U（噪声 3.0）；注入布局下属于 Y（噪声 2.0）
    let event = Event {
        raw_digits: vec![RawDigit {
            channel: 3,
            adcs: vec![400; 32],
        }],
        wires: vec![Wire::new(
            3,
            vec![Roi::new(0, vec![10.0, 10.0, 10.0, 11.0, 13.5])],
        )],
        ..Event::default()
    };
    let processor = EventProcessor::new(PipelineConfig::default(), ScaleModel::identity())
        .expect("默认配置应有效")
        .with_channel_map(CollectionOnly);

    let processed = processor.process_event(event, Stage::All).expect("处理应成功");

    // Y 宽度 2.53 不覆盖 13.5 → 基线 41/4
    let baseline = processed.report.baselines[0].baseline;
    assert!((baseline - 41.0 / 4.0).abs() < 1e-5, "baseline = {baseline}");

    let filter = processed.report.filter.expect("应有过滤报告");
    assert_eq!(filter.planes[Plane::Y.index()].examined, 1);
    assert_eq!(filter.planes[Plane::U.index()].examined, 0);
    log(
        format!("注入布局下的基线 {baseline:.3}"),
        format!("Baseline under injected layout {baseline:.3}"),
    );
}

#[test]
fn test_event_report_serializes_roi_keys() {
    let event = Event {
        wires: vec![Wire::new(
            5000,
            vec![Roi::new(100, vec![10.0, 10.0, 10.0, 11.0, 11.0, 9.0])],
        )],
        ..Event::default()
    };
    let processor = EventProcessor::new(PipelineConfig::default(), ScaleModel::identity())
        .expect("默认配置应有效");
    let processed = processor.process_event(event, Stage::Baseline).expect("基线阶段应成功");

    let json = serde_json::to_value(&processed.report).expect("报告应可序列化");
    assert_eq!(json["baselines"][0]["key"]["channel"], 5000);
    assert_eq!(json["baselines"][0]["key"]["roi_index"], 0);

    let key = SubRoiKey::new(RoiKey::new(5000, 2), 1);
    let text = serde_json::to_string(&key).expect("子ROI键应可序列化");
    let back: SubRoiKey = serde_json::from_str(&text).expect("子ROI键应可反序列化");
    assert_eq!(back, key);
}

// ========== 电荷重分配 ==========

#[test]
fn test_modify_doubles_matched_roi() {
    let original = pulse_wire(1000);
    let event = Event {
        wires: vec![original.clone()],
        deposits: vec![deposit_at_tick(1010.0, 1.0)],
        ..Event::default()
    };
    let processor = EventProcessor::new(
        PipelineConfig::default(),
        overall_model(ScaleValues::new(2.0, 1.0)),
    )
    .expect("处理器应可构建");

    let processed = processor.process_event(event, Stage::Modify).expect("修改阶段应成功");
    let report = processed.report.modifier.expect("应有修改报告");
    assert_eq!(report.rois_modified, 1);
    assert_eq!(report.sub_rois_scaled, 1);

    for (a, b) in processed.event.wires[0].rois[0]
        .data
        .iter()
        .zip(&original.rois[0].data)
    {
        assert!((a - 2.0 * b).abs() < 1e-3, "{a} vs 2 × {b}");
    }
    log("匹配ROI电荷加倍", "Matched ROI charge doubled");
}

#[test]
fn test_low_energy_guard_keeps_waveform() {
    let original = pulse_wire(1000);
    let event = Event {
        wires: vec![original.clone()],
        deposits: vec![deposit_at_tick(1010.0, 0.1)],
        ..Event::default()
    };
    let processor = EventProcessor::new(
        PipelineConfig::default(),
        overall_model(ScaleValues::new(2.0, 1.5)),
    )
    .expect("处理器应可构建");

    let processed = processor.process_event(event, Stage::Modify).expect("修改阶段应成功");
    assert_eq!(processed.event.wires, vec![original]);
    assert_eq!(processed.report.modifier.map(|m| m.sub_rois_guarded), Some(1));
    log("低能量保护：波形保持不变", "Low-energy guard: waveform unchanged");
}

#[test]
fn test_non_finite_scale_falls_back_to_identity() {
    let original = pulse_wire(1000);
    let event = Event {
        wires: vec![original.clone()],
        deposits: vec![deposit_at_tick(1010.0, 1.0)],
        ..Event::default()
    };
    let processor = EventProcessor::new(
        PipelineConfig::default(),
        overall_model(ScaleValues::new(f64::NAN, 1.0)),
    )
    .expect("处理器应可构建");

    let processed = processor.process_event(event, Stage::Modify).expect("修改阶段应成功");
    let data = &processed.event.wires[0].rois[0].data;
    assert!(data.iter().all(|s| s.is_finite()));
    for (a, b) in data.iter().zip(&original.rois[0].data) {
        assert!((a - b).abs() < 1e-4);
    }
    assert_eq!(processed.report.modifier.map(|m| m.sub_rois_non_finite), Some(1));
}

#[test]
fn test_deposit_outside_rois_leaves_event_unchanged() {
    let original = pulse_wire(1000);
    let event = Event {
        wires: vec![original.clone()],
        deposits: vec![deposit_at_tick(3000.0, 5.0)],
        ..Event::default()
    };
    let processor = EventProcessor::new(
        PipelineConfig::default(),
        overall_model(ScaleValues::new(3.0, 2.0)),
    )
    .expect("处理器应可构建");

    let processed = processor.process_event(event, Stage::All).expect("全部阶段应成功");
    let report = processed.report.modifier.expect("应有修改报告");
    assert_eq!(report.projections_matched, 0);
    assert_eq!(report.rois_untouched, 1);
}

// ========== 配置与标定表 ==========

#[test]
fn test_pipeline_config_partial_json() {
    let dir = tempdir().expect("创建临时目录失败");
    let path = dir.path().join("pipeline.json");
    fs::write(
        &path,
        r#"{ "filter": { "rms_rejection_cut": [8.0, 8.0, 4.0] }, "baseline": { "subtract": false } }"#,
    )
    .expect("写入配置失败");

    let config = PipelineConfig::from_json_file(&path).expect("配置应可加载");
    assert_eq!(config.filter.rms_rejection_cut, [8.0, 8.0, 4.0]);
    assert!(!config.baseline.subtract);
    assert_eq!(config.filter.trunc_mean_fraction, 0.2);
}

#[test]
fn test_invalid_pipeline_config_rejected() {
    let dir = tempdir().expect("创建临时目录失败");
    let path = dir.path().join("pipeline.json");
    fs::write(&path, r#"{ "filter": { "trunc_mean_fraction": 1.5 } }"#).expect("写入配置失败");

    assert!(matches!(
        PipelineConfig::from_json_file(&path),
        Err(RoiError::ConfigError(_))
    ));
}

#[test]
fn test_enabled_surface_without_table_is_config_error() {
    let result = ScaleModel::from_config(&ScaleModelConfig::default(), &ScaleTables::default());
    assert!(matches!(result, Err(RoiError::ConfigError(_))));

    let disabled = ScaleModel::from_config(&ScaleModelConfig::disabled(), &ScaleTables::default())
        .expect("全部关闭时不需要标定表");
    assert!(disabled.is_empty());
    log("缺失标定表返回配置错误", "Missing table yields config error");
}

#[test]
fn test_scale_tables_from_json() {
    let dir = tempdir().expect("创建临时目录失败");
    let path = dir.path().join("scales.json");
    fs::write(
        &path,
        r#"{
            "x": [
                { "charge": { "x": [0.0, 100.0], "y": [1.0, 1.2] }, "sigma": { "x": [0.0], "y": [1.0] } },
                { "charge": { "x": [0.0, 100.0], "y": [1.0, 1.2] }, "sigma": { "x": [0.0], "y": [1.0] } },
                { "charge": { "x": [0.0, 100.0], "y": [1.0, 1.2] }, "sigma": { "x": [0.0], "y": [1.0] } }
            ]
        }"#,
    )
    .expect("写入标定表失败");

    let tables = ScaleTables::from_json_file(&path).expect("标定表应可加载");
    let config = ScaleModelConfig {
        apply_x_scale: true,
        ..ScaleModelConfig::disabled()
    };
    let model = ScaleModel::from_config(&config, &tables).expect("模型应可构建");
    assert_eq!(model.len(), 1);
}

#[test]
fn test_malformed_scale_tables_rejected() {
    let dir = tempdir().expect("创建临时目录失败");
    let path = dir.path().join("scales.json");
    fs::write(&path, "{ not json").expect("写入标定表失败");
    assert!(matches!(
        ScaleTables::from_json_file(&path),
        Err(RoiError::FormatError(_))
    ));
}
