//! Keyframe curves to animation controllers.

use glam::Quat;
use itertools::Itertools;
use tracing::{debug, warn};

use crate::error::{ExportError, ExportResult};
use crate::recognized::Recognized;
use crate::scene::{AnimationCurve, Channel, SceneNode};
use crate::shape::{AnimNode, Animation, Controller, LinearKey, SlerpRot};

use super::ExportContext;
use super::hierarchy::Hierarchy;

/// Frames closer than this count as the same keyframe time.
const FRAME_TOLERANCE: f32 = 1e-4;

impl ExportContext<'_> {
    /// Build the shape's animation when any hierarchy entry is animated.
    pub fn add_animation(&mut self, hierarchy: &Hierarchy) -> ExportResult<()> {
        let scene = self.scene;
        let animated = hierarchy
            .nodes
            .iter()
            .flatten()
            .any(|&node| !scene.nodes[node].curves.is_empty());
        if !animated {
            return Ok(());
        }

        let mut nodes = Vec::with_capacity(hierarchy.len());
        for (entry, node) in hierarchy.nodes.iter().enumerate() {
            let controllers = match node {
                Some(node) => controllers(&scene.nodes[*node])?,
                None => Vec::new(),
            };
            nodes.push(AnimNode {
                label: self.shape.matrices[entry].label.clone(),
                controllers,
            });
        }

        self.shape.animations.push(Animation {
            frame_count: scene.frame_end as u32,
            frame_rate: self.options.frame_rate,
            nodes,
        });
        Ok(())
    }
}

/// One controller per consecutive group of curves sharing a channel.
fn controllers(node: &SceneNode) -> ExportResult<Vec<Controller>> {
    let curves = &node.curves;
    let mut controllers = Vec::new();
    let mut start = 0;

    while start < curves.len() {
        let channel = match &curves[start].channel {
            Recognized::Known(channel) => *channel,
            Recognized::Unknown(raw) => {
                warn!("Skipping unsupported animation channel {raw:?} on {}", node.name);
                start += 1;
                continue;
            }
        };

        let width = channel.width();
        let found = curves[start..]
            .iter()
            .take(width)
            .take_while(|curve| curve.channel == Recognized::Known(channel))
            .count();
        if found < width {
            return Err(ExportError::IncompleteChannelGroup {
                node: node.name.clone(),
                channel: channel.to_string(),
                expected: width,
                found,
            });
        }

        let group = curves[start..start + width]
            .iter()
            .sorted_by_key(|curve| curve.index)
            .collect::<Vec<_>>();
        check_aligned(node, channel, &group)?;
        debug!("{}: {channel} with {} keys", node.name, group[0].keyframes.len());

        controllers.push(controller(channel, &group));
        start += width;
    }

    Ok(controllers)
}

fn check_aligned(node: &SceneNode, channel: Channel, group: &[&AnimationCurve]) -> ExportResult<()> {
    let first = &group[0].keyframes;
    let aligned = group[1..].iter().all(|curve| {
        curve.keyframes.len() == first.len()
            && curve
                .keyframes
                .iter()
                .zip(first)
                .all(|(a, b)| (a.frame - b.frame).abs() <= FRAME_TOLERANCE)
    });
    if aligned {
        Ok(())
    } else {
        Err(ExportError::MisalignedKeyframes {
            node: node.name.clone(),
            channel: channel.to_string(),
        })
    }
}

/// Convert a group of aligned curves, sorted by index, into shape axes.
fn controller(channel: Channel, group: &[&AnimationCurve]) -> Controller {
    let value = |component: usize, key: usize| group[component].keyframes[key].value;
    let frames = group[0].keyframes.iter().map(|k| k.frame).enumerate();

    match channel {
        Channel::Location => Controller::Position(
            frames
                .map(|(i, frame)| LinearKey {
                    frame,
                    x: value(0, i),
                    y: value(2, i),
                    z: value(1, i),
                })
                .collect(),
        ),
        Channel::RotationQuaternion => Controller::Rotation(
            frames
                .map(|(i, frame)| SlerpRot {
                    frame,
                    x: value(1, i),
                    y: value(3, i),
                    z: value(2, i),
                    w: value(0, i),
                })
                .collect(),
        ),
        Channel::RotationEuler => Controller::Rotation(
            frames
                .map(|(i, frame)| {
                    let q = Quat::from_rotation_z(value(2, i))
                        * Quat::from_rotation_y(value(1, i))
                        * Quat::from_rotation_x(value(0, i));
                    SlerpRot {
                        frame,
                        x: q.x,
                        y: q.z,
                        z: q.y,
                        w: q.w,
                    }
                })
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{ExportOptions, test_context};
    use crate::scene::{Keyframe, Scene};
    use std::f32::consts::FRAC_PI_2;

    fn curve(channel: &str, index: usize, keys: &[(f32, f32)]) -> AnimationCurve {
        AnimationCurve {
            channel: Recognized::parse(channel),
            index,
            keyframes: keys
                .iter()
                .map(|&(frame, value)| Keyframe { frame, value })
                .collect(),
        }
    }

    fn node(curves: Vec<AnimationCurve>) -> SceneNode {
        SceneNode::builder().name("door").curves(curves).build()
    }

    #[test]
    fn location_swaps_y_and_z() {
        // Listed out of index order on purpose.
        let door = node(vec![
            curve("location", 2, &[(0.0, 3.0), (10.0, 30.0)]),
            curve("location", 0, &[(0.0, 1.0), (10.0, 10.0)]),
            curve("location", 1, &[(0.0, 2.0), (10.0, 20.0)]),
        ]);
        let controllers = controllers(&door).unwrap();
        assert_eq!(
            controllers,
            vec![Controller::Position(vec![
                LinearKey {
                    frame: 0.0,
                    x: 1.0,
                    y: 3.0,
                    z: 2.0
                },
                LinearKey {
                    frame: 10.0,
                    x: 10.0,
                    y: 30.0,
                    z: 20.0
                },
            ])]
        );
    }

    #[test]
    fn quaternion_components_are_reordered() {
        let door = node(vec![
            curve("rotation_quaternion", 0, &[(1.0, 0.5)]),
            curve("rotation_quaternion", 1, &[(1.0, 0.1)]),
            curve("rotation_quaternion", 2, &[(1.0, 0.2)]),
            curve("rotation_quaternion", 3, &[(1.0, 0.3)]),
        ]);
        let controllers = controllers(&door).unwrap();
        assert_eq!(
            controllers,
            vec![Controller::Rotation(vec![SlerpRot {
                frame: 1.0,
                x: 0.1,
                y: 0.3,
                z: 0.2,
                w: 0.5
            }])]
        );
    }

    #[test]
    fn euler_becomes_quaternion() {
        // A quarter turn about scene Z is a quarter turn about shape Y.
        let door = node(vec![
            curve("rotation_euler", 0, &[(0.0, 0.0)]),
            curve("rotation_euler", 1, &[(0.0, 0.0)]),
            curve("rotation_euler", 2, &[(0.0, FRAC_PI_2)]),
        ]);
        let controllers = controllers(&door).unwrap();
        let Controller::Rotation(keys) = &controllers[0] else {
            panic!("expected a rotation controller");
        };
        let half = (FRAC_PI_2 / 2.0).sin();
        assert!(keys[0].x.abs() < 1e-6);
        assert!((keys[0].y - half).abs() < 1e-6);
        assert!(keys[0].z.abs() < 1e-6);
        assert!((keys[0].w - (FRAC_PI_2 / 2.0).cos()).abs() < 1e-6);
    }

    #[test]
    fn groups_keep_input_order_and_skip_unknown_channels() {
        let door = node(vec![
            curve("rotation_quaternion", 0, &[(0.0, 1.0)]),
            curve("rotation_quaternion", 1, &[(0.0, 0.0)]),
            curve("rotation_quaternion", 2, &[(0.0, 0.0)]),
            curve("rotation_quaternion", 3, &[(0.0, 0.0)]),
            curve("scale", 0, &[(0.0, 1.0)]),
            curve("location", 0, &[(0.0, 0.0)]),
            curve("location", 1, &[(0.0, 0.0)]),
            curve("location", 2, &[(0.0, 0.0)]),
        ]);
        let controllers = controllers(&door).unwrap();
        assert_eq!(controllers.len(), 2);
        assert!(matches!(controllers[0], Controller::Rotation(_)));
        assert!(matches!(controllers[1], Controller::Position(_)));
    }

    #[test]
    fn misaligned_and_incomplete_groups_fail() {
        let door = node(vec![
            curve("location", 0, &[(0.0, 0.0), (5.0, 1.0)]),
            curve("location", 1, &[(0.0, 0.0), (6.0, 1.0)]),
            curve("location", 2, &[(0.0, 0.0), (5.0, 1.0)]),
        ]);
        assert!(matches!(
            controllers(&door),
            Err(ExportError::MisalignedKeyframes { .. })
        ));

        let door = node(vec![
            curve("location", 0, &[(0.0, 0.0)]),
            curve("location", 1, &[(0.0, 0.0)]),
            curve("rotation_euler", 0, &[(0.0, 0.0)]),
        ]);
        assert!(matches!(
            controllers(&door),
            Err(ExportError::IncompleteChannelGroup {
                expected: 3,
                found: 2,
                ..
            })
        ));
    }

    #[test]
    fn every_hierarchy_entry_gets_a_node() {
        let scene = Scene::builder()
            .nodes(vec![
                SceneNode::builder().name("body").build(),
                node(vec![
                    curve("location", 0, &[(0.0, 0.0)]),
                    curve("location", 1, &[(0.0, 0.0)]),
                    curve("location", 2, &[(0.0, 0.0)]),
                ]),
            ])
            .frame_end(24.0)
            .build();
        let options = ExportOptions::default();
        let mut ctx = test_context(&scene, &options, &["MAIN", "body", "door"]);
        let hierarchy = Hierarchy {
            parents: vec![-1, 0, 0],
            nodes: vec![None, Some(0), Some(1)],
            labels: vec!["MAIN".into(), "body".into(), "door".into()],
            objects: vec![Vec::new(), vec![0], vec![1]],
        };

        ctx.add_animation(&hierarchy).unwrap();
        let animation = &ctx.shape.animations[0];
        assert_eq!(animation.frame_count, 24);
        assert_eq!(animation.frame_rate, 30);
        let labels = animation.nodes.iter().map(|n| n.label.as_str()).collect::<Vec<_>>();
        assert_eq!(labels, vec!["MAIN", "body", "door"]);
        assert!(animation.nodes[0].controllers.is_empty());
        assert!(animation.nodes[1].controllers.is_empty());
        assert_eq!(animation.nodes[2].controllers.len(), 1);
    }

    #[test]
    fn static_shapes_have_no_animation() {
        let scene = Scene::builder()
            .nodes(vec![SceneNode::builder().name("body").build()])
            .build();
        let options = ExportOptions::default();
        let mut ctx = test_context(&scene, &options, &["MAIN", "body"]);
        let hierarchy = Hierarchy {
            parents: vec![-1, 0],
            nodes: vec![None, Some(0)],
            labels: vec!["MAIN".into(), "body".into()],
            objects: vec![Vec::new(), vec![0]],
        };
        ctx.add_animation(&hierarchy).unwrap();
        assert!(ctx.shape.animations.is_empty());
    }
}
