//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 固定帧场景的完整输出校验
//! - 帧源 -> 分发器 -> 传输 的 e2e 流程（无需追踪服务器）
//! - 故障隔离

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use contracts::{
        BusEnvelope, ColorRgba, FrameSource, LabelledMarker, MarkerType, MocapFrame,
        OutboundMessage, PointStamped, PoseStamped, Quaternion, RigidBody, Stamp, Vector3,
        VisualizationMarker, WireFormat,
    };
    use dispatcher::{
        Dispatcher, FileWriter, FileWriterConfig, MemorySink, NetworkWriter, NetworkWriterConfig,
        QueuedSink,
    };
    use frame_source::{FakeFrameSource, SourceOptions, SUBSCRIBE_DATAGRAM};

    type SharedDispatcher = Arc<Mutex<Dispatcher<MemorySink>>>;

    /// Drive `source` into a shared dispatcher backed by a MemorySink
    fn run_into_memory(mut source: Box<dyn FrameSource>, sink: MemorySink) -> SharedDispatcher {
        let dispatcher = Arc::new(Mutex::new(Dispatcher::new(sink).unwrap()));
        let shared = Arc::clone(&dispatcher);
        source.set_callback(Box::new(move |frame: &MocapFrame| {
            shared.lock().unwrap().on_frame(frame);
        }));
        source.spin().unwrap();
        dispatcher
    }

    /// End-to-end test: fake source -> Dispatcher -> MemorySink
    ///
    /// 验证固定帧的完整输出：
    /// 1. 三个通道依次创建（可视化、刚体 0、标记点 1）
    /// 2. 发布顺序为 位姿 -> 聚合可视化 -> 独立标记点
    /// 3. 模型 7 的标记点只出现在聚合中
    #[test]
    fn test_e2e_canned_frame() {
        let source = frame_source::connect("fake", &SourceOptions::default()).unwrap();
        let dispatcher = run_into_memory(source, MemorySink::new("mem"));
        let dispatcher = dispatcher.lock().unwrap();
        let sink = dispatcher.sink();

        let topics: Vec<&str> = sink.advertised().iter().map(|a| a.topic.as_str()).collect();
        assert_eq!(
            topics,
            vec!["/mocap/markers/vis", "/mocap/rigid_bodies/0/pose", "/mocap/markers/1"]
        );

        let published = sink.published();
        assert_eq!(published.len(), 3);

        let stamp = Stamp { secs: 1, nsecs: 0 };

        match &published[0].message {
            OutboundMessage::Pose(PoseStamped { header, pose }) => {
                assert_eq!(header.frame_id, "mocap_motive");
                assert_eq!(header.stamp, stamp);
                assert_eq!(pose.position, Vector3::default());
                assert_eq!(pose.orientation, Quaternion::IDENTITY);
            }
            other => panic!("expected pose, got {:?}", other),
        }

        match &published[1].message {
            OutboundMessage::Visualization(VisualizationMarker {
                header,
                ns,
                id,
                marker_type,
                points,
                scale,
                color,
            }) => {
                assert_eq!(published[1].topic, "/mocap/markers/vis");
                assert_eq!(header.stamp, stamp);
                assert_eq!(ns, "python_natnet");
                assert_eq!(*id, 0);
                assert_eq!(*marker_type, MarkerType::SphereList);
                assert_eq!(points, &vec![Vector3::splat(1.0), Vector3::splat(2.0)]);
                assert!((scale.x - 0.2).abs() < 1e-12);
                assert_eq!(scale.x, scale.y);
                assert_eq!(scale.y, scale.z);
                assert_eq!(*color, ColorRgba::WHITE);
            }
            other => panic!("expected visualization, got {:?}", other),
        }

        match &published[2].message {
            OutboundMessage::Point(PointStamped { header, point }) => {
                assert_eq!(published[2].topic, "/mocap/markers/1");
                assert_eq!(header.stamp, stamp);
                assert_eq!(*point, Vector3::splat(1.0));
            }
            other => panic!("expected point, got {:?}", other),
        }

        assert_eq!(sink.published_on("/mocap/markers/2").count(), 0);
    }

    /// Replaying an identical frame publishes it again on every channel
    #[test]
    fn test_e2e_identical_replay() {
        let frame = frame_source::canned_frame();
        let source = Box::new(FakeFrameSource::new([frame.clone(), frame]));
        let dispatcher = run_into_memory(source, MemorySink::new("mem"));
        let dispatcher = dispatcher.lock().unwrap();
        let sink = dispatcher.sink();

        for topic in [
            "/mocap/rigid_bodies/0/pose",
            "/mocap/markers/vis",
            "/mocap/markers/1",
        ] {
            let messages: Vec<_> = sink.published_on(topic).collect();
            assert_eq!(messages.len(), 2, "topic {}", topic);
            assert_eq!(messages[0], messages[1]);
        }
        assert_eq!(sink.advertised().len(), 3);
    }

    /// Rigid-body publish failure leaves the rest of the frame intact
    #[test]
    fn test_e2e_failure_isolation() {
        let mut sink = MemorySink::new("mem");
        sink.fail_publishes_on("/mocap/rigid_bodies/0/pose");

        let source = frame_source::connect("fake", &SourceOptions::default()).unwrap();
        let dispatcher = run_into_memory(source, sink);
        let dispatcher = dispatcher.lock().unwrap();

        let topics: Vec<&str> = dispatcher
            .sink()
            .published()
            .iter()
            .map(|p| p.topic.as_str())
            .collect();
        assert_eq!(topics, vec!["/mocap/markers/vis", "/mocap/markers/1"]);

        let metrics = dispatcher.metrics_snapshot();
        assert_eq!(metrics.frames, 1);
        assert_eq!(metrics.publish_count, 2);
        assert_eq!(metrics.failure_count, 1);
    }

    /// Rigid bodies keep their channels when later frames carry fewer
    #[test]
    fn test_e2e_shrinking_rigid_body_set() {
        let body = |x: f64| RigidBody {
            position: Vector3::new(x, 0.0, 0.0),
            orientation: Quaternion::IDENTITY,
        };
        let frames = vec![
            MocapFrame::new(0.0).with_rigid_bodies(vec![body(0.0), body(1.0), body(2.0)]),
            MocapFrame::new(0.01).with_rigid_bodies(vec![body(0.5)]),
        ];

        let dispatcher = run_into_memory(
            Box::new(FakeFrameSource::new(frames)),
            MemorySink::new("mem"),
        );
        let dispatcher = dispatcher.lock().unwrap();

        assert_eq!(dispatcher.registry().len(), 3);
        let sink = dispatcher.sink();
        assert_eq!(sink.published_on("/mocap/rigid_bodies/0/pose").count(), 2);
        assert_eq!(sink.published_on("/mocap/rigid_bodies/2/pose").count(), 1);
    }

    /// End-to-end test: UDP relay -> UdpFrameSource -> Dispatcher -> QueuedSink(FileWriter)
    #[tokio::test]
    async fn test_e2e_udp_source_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let relay = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        relay
            .set_read_timeout(Some(std::time::Duration::from_secs(2)))
            .unwrap();

        let options = SourceOptions {
            format: WireFormat::Bincode,
            read_timeout: std::time::Duration::from_millis(20),
            ..Default::default()
        };
        let address = relay.local_addr().unwrap().to_string();
        let mut source = frame_source::connect(&address, &options).unwrap();

        let mut buf = [0u8; 64];
        let (n, client) = relay.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], SUBSCRIBE_DATAGRAM);

        let writer = FileWriter::new(
            "capture",
            FileWriterConfig {
                base_path: dir.path().to_path_buf(),
                file_name: Some("bus.jsonl".to_string()),
            },
        )
        .unwrap();
        let (sink, worker) = QueuedSink::spawn(writer, 64);
        let mut dispatcher = Dispatcher::new(sink).unwrap();

        let target_frames = 3u64;
        let stop = source.stop_handle();
        source.set_callback(Box::new(move |frame: &MocapFrame| {
            dispatcher.on_frame(frame);
            if dispatcher.metrics().frames() >= target_frames {
                stop.stop();
            }
        }));

        for i in 0..target_frames {
            let mut frame = MocapFrame::new(1.0 + i as f64 * 0.01).with_rigid_bodies(vec![
                RigidBody {
                    position: Vector3::new(i as f64, 0.0, 0.0),
                    orientation: Quaternion::IDENTITY,
                },
            ]);
            frame.frame_number = Some(i);
            relay
                .send_to(&WireFormat::Bincode.encode(&frame).unwrap(), client)
                .unwrap();
        }

        let spin = tokio::task::spawn_blocking(move || source.spin());
        tokio::time::timeout(std::time::Duration::from_secs(5), spin)
            .await
            .expect("source did not stop")
            .unwrap()
            .unwrap();

        // The dispatcher (and the queue sender) went down with the source
        worker.join().await;

        let content = std::fs::read_to_string(dir.path().join("bus.jsonl")).unwrap();
        let envelopes: Vec<BusEnvelope> = content
            .lines()
            .map(|line| {
                let record: serde_json::Value = serde_json::from_str(line).unwrap();
                serde_json::from_value(record["envelope"].clone()).unwrap()
            })
            .collect();

        // vis + rigid body 0 advertisements, then one pose per frame
        assert_eq!(envelopes.len(), 2 + target_frames as usize);
        let advertised: Vec<&str> = envelopes[..2]
            .iter()
            .filter(|e| matches!(e, BusEnvelope::Advertise { .. }))
            .map(|e| e.topic())
            .collect();
        assert_eq!(advertised, vec!["/mocap/markers/vis", "/mocap/rigid_bodies/0/pose"]);

        for (i, envelope) in envelopes[2..].iter().enumerate() {
            match envelope {
                BusEnvelope::Publish {
                    message: OutboundMessage::Pose(pose),
                    ..
                } => assert_eq!(pose.pose.position.x, i as f64),
                other => panic!("expected pose publish, got {:?}", other),
            }
        }
    }

    /// End-to-end test: Dispatcher -> QueuedSink(NetworkWriter) -> UDP bus
    #[tokio::test]
    async fn test_e2e_network_bus() {
        let bus = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let writer = NetworkWriter::new(
            "bus",
            NetworkWriterConfig {
                addr: bus.local_addr().unwrap(),
                format: WireFormat::Json,
                max_packet_size: 65000,
            },
        )
        .await
        .unwrap();
        let (sink, worker) = QueuedSink::spawn(writer, 16);

        let mut dispatcher = Dispatcher::new(sink).unwrap();
        let frame = MocapFrame::new(2.5).with_markers(vec![LabelledMarker {
            marker_id: 9,
            model_id: LabelledMarker::NO_MODEL,
            position: Vector3::new(0.1, 0.2, 0.3),
            size: 0.05,
        }]);
        let report = dispatcher.on_frame(&frame);
        assert!(report.is_clean());
        drop(dispatcher);
        worker.join().await;

        let mut received = HashMap::new();
        let mut buf = vec![0u8; 65536];
        // vis advertise, marker advertise, aggregate publish, point publish
        for _ in 0..4 {
            let n = tokio::time::timeout(std::time::Duration::from_secs(2), bus.recv(&mut buf))
                .await
                .unwrap()
                .unwrap();
            let envelope: BusEnvelope = WireFormat::Json.decode(&buf[..n]).unwrap();
            let kind = match &envelope {
                BusEnvelope::Advertise { .. } => "advertise",
                BusEnvelope::Publish { .. } => "publish",
            };
            received
                .entry((kind, envelope.topic().to_string()))
                .or_insert(envelope);
        }

        assert_eq!(received.len(), 4);
        match &received[&("publish", "/mocap/markers/9".to_string())] {
            BusEnvelope::Publish {
                message: OutboundMessage::Point(point),
                ..
            } => {
                assert_eq!(point.header.stamp, Stamp { secs: 2, nsecs: 500_000_000 });
                assert_eq!(point.point, Vector3::new(0.1, 0.2, 0.3));
            }
            other => panic!("expected point publish, got {:?}", other),
        }
    }
}
