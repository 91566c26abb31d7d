use lumen_ngin::data_structures::batched_sprite::{InstanceError, SpriteInstance, VERTICES_PER_SPRITE};

use crate::common::test_utils::batch;

mod common;

#[test]
fn push_fills_six_rows_per_instance_with_defaults() {
    let mut batch = batch(0);
    let index = batch.push(SpriteInstance {
        position: [1.0, 2.0],
        elevation: 3.0,
        ..Default::default()
    });

    assert_eq!(index, 0);
    assert_eq!(batch.len(), 1);
    assert_eq!(batch.vertex_count(), VERTICES_PER_SPRITE);
    assert_eq!(batch.positions(), [[1.0, 2.0, 3.0]; 6]);
    assert_eq!(batch.scales(), [[1.0, 1.0]; 6]);
    assert_eq!(batch.offsets(), [[0.0, 0.0]; 6]);
    assert_eq!(batch.opacities(), [1.0; 6]);
    assert_eq!(batch.dispositions().len(), 6);
}

#[test]
fn set_uv_uses_the_atlas_convention() {
    let mut batch = batch(1);

    batch.set_uv(0, [1.0, 2.0, 3.0, 4.0]).unwrap();

    assert_eq!(
        batch.uvs(),
        [
            [3.0, -3.0],
            [3.0, -1.0],
            [1.0, -3.0],
            [1.0, -1.0],
            [1.0, -3.0],
            [3.0, -1.0],
        ]
    );
}

#[test]
fn set_size_only_touches_the_targeted_instance() {
    let mut batch = batch(2);
    let before = batch.scales().to_vec();

    batch.set_size(0, [5.0, 7.0]).unwrap();

    assert_eq!(batch.scales()[..6], [[5.0, 7.0]; 6]);
    assert_eq!(batch.scales()[6..], before[6..]);
}

#[test]
fn mutators_leave_other_instances_bit_for_bit_unchanged() {
    let mut batch = batch(3);
    let positions = batch.positions().to_vec();
    let offsets = batch.offsets().to_vec();
    let uvs = batch.uvs().to_vec();
    let opacities = batch.opacities().to_vec();

    batch.set_position(1, [9.0, 9.0]).unwrap();
    batch.set_offset(1, [4.0, -4.0]).unwrap();
    batch.set_uv(1, [0.25, 0.0, 0.5, 0.25]).unwrap();
    batch.set_opacity(1, 0.5).unwrap();

    for rows in [0..6, 12..18] {
        assert_eq!(batch.positions()[rows.clone()], positions[rows.clone()]);
        assert_eq!(batch.offsets()[rows.clone()], offsets[rows.clone()]);
        assert_eq!(batch.uvs()[rows.clone()], uvs[rows.clone()]);
        assert_eq!(batch.opacities()[rows.clone()], opacities[rows]);
    }
    assert_eq!(batch.offsets()[6..12], [[4.0, -4.0]; 6]);
    assert_eq!(batch.opacities()[6..12], [0.5; 6]);
}

#[test]
fn position_and_elevation_are_independent() {
    let mut batch = batch(0);
    batch.push([1.0, 2.0]);

    batch.set_elevation(0, 5.0).unwrap();
    assert_eq!(batch.positions(), [[1.0, 2.0, 5.0]; 6]);

    batch.set_position(0, [3.0, 4.0]).unwrap();
    assert_eq!(batch.positions(), [[3.0, 4.0, 5.0]; 6]);
}

#[test]
fn out_of_range_index_is_rejected() {
    let mut batch = batch(2);
    let scales = batch.scales().to_vec();

    let error = InstanceError::OutOfRange { index: 2, len: 2 };
    assert_eq!(batch.set_size(2, [1.0, 1.0]), Err(error));
    assert_eq!(batch.set_position(2, [1.0, 1.0]), Err(error));
    assert_eq!(batch.set_elevation(2, 1.0), Err(error));
    assert_eq!(batch.set_offset(2, [1.0, 1.0]), Err(error));
    assert_eq!(batch.set_opacity(2, 1.0), Err(error));
    assert_eq!(batch.set_uv(2, [0.0; 4]), Err(error));
    assert_eq!(batch.scales(), scales);
    assert_eq!(
        error.to_string(),
        "sprite instance 2 is out of range for a batch of 2"
    );
}
