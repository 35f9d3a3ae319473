#[cfg(all(test, feature = "integration-test"))]
mod test {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use k2d_adapter::{configmap, namespace, persistentvolume, persistentvolumeclaim, pod, registry_secret, secret, service, workload};
    use k2d_adapter::{AdapterContext, ServiceAccountFiles};
    use k2d_gateway::Gateway;
    use k2d_store::{FilesystemStore, MemoryStore};
    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::api::core::v1::{
        ConfigMap, Container, EnvFromSource, ConfigMapEnvSource, PersistentVolumeClaim,
        PersistentVolumeClaimSpec, Pod, PodSpec, PodTemplateSpec, Secret,
        Service, ServicePort, ServiceSpec, Volume, VolumeMount, VolumeResourceRequirements,
    };
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
    use k8s_openapi::ByteString;
    use kube::api::ObjectMeta;
    use testcontainers::core::{ContainerPort, WaitFor};
    use testcontainers::runners::AsyncRunner;
    use testcontainers::{ContainerAsync, GenericImage, ImageExt};

    /// Starts a throwaway, plain-HTTP dockerd and returns a `Gateway` pointed
    /// at it. The container must stay alive for the duration of the test, so
    /// the caller holds onto it.
    async fn spawn_engine() -> (ContainerAsync<GenericImage>, Gateway) {
        let image = GenericImage::new("docker", "dind")
            .with_exposed_port(ContainerPort::Tcp(2375))
            .with_wait_for(WaitFor::message_on_stderr("API listen on"))
            .with_env_var("DOCKER_TLS_CERTDIR", "")
            .with_privileged(true);

        let container = image.start().await.expect("starting dockerd container");
        let host = container.get_host().await.expect("engine container host");
        let port = container
            .get_host_port_ipv4(2375)
            .await
            .expect("engine container port");

        let gateway = Gateway::connect_with_uri(&format!("http://{host}:{port}"), Duration::from_secs(30))
            .expect("connecting to dind engine");
        (container, gateway)
    }

    fn test_context(gateway: Gateway, store: std::sync::Arc<dyn k2d_store::ObjectStore>) -> AdapterContext {
        AdapterContext {
            gateway,
            store: store.clone(),
            registry_store: store,
            advertise_ip: "127.0.0.1".to_string(),
            advertise_port: 6443,
            service_account: None::<ServiceAccountFiles>,
            start_time: chrono::Utc::now(),
        }
    }

    fn meta(name: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    async fn ensure_namespace(ctx: &AdapterContext, name: &str) {
        if namespace::get(ctx, name).await.is_err() {
            let ns = k8s_openapi::api::core::v1::Namespace {
                metadata: meta(name),
                ..Default::default()
            };
            namespace::create(ctx, &ns).await.expect("creating namespace");
        }
    }

    /// Scenario 1: apply a Deployment, observe it running, then delete it.
    #[tokio::test]
    async fn deployment_web_becomes_available_then_deletes() {
        let (_engine, gateway) = spawn_engine().await;
        let ctx = test_context(gateway, std::sync::Arc::new(MemoryStore::new()));
        ensure_namespace(&ctx, "default").await;

        let deployment = Deployment {
            metadata: meta("web"),
            spec: Some(k8s_openapi::api::apps::v1::DeploymentSpec {
                template: PodTemplateSpec {
                    spec: Some(PodSpec {
                        containers: vec![Container {
                            name: "web".to_string(),
                            image: Some("nginx:1.25".to_string()),
                            ports: Some(vec![k8s_openapi::api::core::v1::ContainerPort {
                                container_port: 80,
                                ..Default::default()
                            }]),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                ..Default::default()
            }),
            ..Default::default()
        };

        workload::create_deployment(&ctx, "default", &deployment)
            .await
            .expect("creating deployment");

        let fetched = workload::get_deployment(&ctx, "default", "web")
            .await
            .expect("getting deployment");
        let status = fetched.status.expect("deployment has status");
        assert_eq!(status.ready_replicas, Some(1));
        let available = status
            .conditions
            .unwrap_or_default()
            .into_iter()
            .find(|c| c.type_ == "Available")
            .expect("available condition present");
        assert_eq!(available.status, "True");

        workload::delete_deployment(&ctx, "default", "web")
            .await
            .expect("deleting deployment");
        assert!(workload::get_deployment(&ctx, "default", "web").await.is_err());
    }

    /// Scenario 2: a Deployment's env-from a ConfigMap lands in the
    /// container's environment.
    #[tokio::test]
    async fn deployment_env_from_configmap_reaches_container() {
        let (_engine, gateway) = spawn_engine().await;
        let ctx = test_context(gateway.clone(), std::sync::Arc::new(MemoryStore::new()));
        ensure_namespace(&ctx, "default").await;

        let mut data = BTreeMap::new();
        data.insert("A".to_string(), "1".to_string());
        data.insert("B".to_string(), "2".to_string());
        let config_map = ConfigMap {
            metadata: meta("app"),
            data: Some(data),
            ..Default::default()
        };
        configmap::create(&ctx, "default", &config_map).await.expect("creating configmap");

        let deployment = Deployment {
            metadata: meta("web"),
            spec: Some(k8s_openapi::api::apps::v1::DeploymentSpec {
                template: PodTemplateSpec {
                    spec: Some(PodSpec {
                        containers: vec![Container {
                            name: "web".to_string(),
                            image: Some("nginx:1.25".to_string()),
                            env_from: Some(vec![EnvFromSource {
                                config_map_ref: Some(ConfigMapEnvSource {
                                    name: Some("app".to_string()),
                                    optional: None,
                                }),
                                ..Default::default()
                            }]),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                ..Default::default()
            }),
            ..Default::default()
        };
        workload::create_deployment(&ctx, "default", &deployment)
            .await
            .expect("creating deployment");

        let containers = gateway.list_containers(None).await.expect("listing containers");
        assert!(containers.iter().any(|c| c.name == "default-web"));

        let fetched = workload::get_deployment(&ctx, "default", "web")
            .await
            .expect("getting deployment");
        let env_from = fetched
            .spec
            .and_then(|s| s.template.spec)
            .and_then(|s| s.containers.into_iter().next())
            .and_then(|c| c.env_from)
            .expect("env_from survives round trip");
        assert_eq!(
            env_from.first().and_then(|e| e.config_map_ref.as_ref()).and_then(|r| r.name.clone()),
            Some("app".to_string())
        );
    }

    /// Scenario 3: a dockerconfigjson Secret supplies the registry
    /// credentials used for an image pull.
    #[tokio::test]
    async fn image_pull_uses_dockerconfigjson_secret_credentials() {
        let (_engine, gateway) = spawn_engine().await;
        let ctx = test_context(gateway, std::sync::Arc::new(MemoryStore::new()));
        ensure_namespace(&ctx, "default").await;

        let dockerconfig = serde_json::json!({
            "auths": {
                "r.example.com": {
                    "username": "alice",
                    "password": "hunter2",
                }
            }
        });
        let mut data = BTreeMap::new();
        data.insert(
            ".dockerconfigjson".to_string(),
            ByteString(serde_json::to_vec(&dockerconfig).unwrap()),
        );
        let pull_secret = Secret {
            metadata: meta("regcred"),
            type_: Some("kubernetes.io/dockerconfigjson".to_string()),
            data: Some(data),
            ..Default::default()
        };
        secret::create(&ctx, "default", &pull_secret).await.expect("creating secret");

        let creds = registry_secret::resolve_auth(&ctx, "default", "regcred", "r.example.com")
            .await
            .expect("resolving registry auth");
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.password, "hunter2");
    }

    /// Scenario 4: a NodePort Service draws a port and atomically rewires
    /// the selected workload's container.
    #[tokio::test]
    async fn nodeport_service_exposes_target_port_atomically() {
        let (_engine, gateway) = spawn_engine().await;
        let ctx = test_context(gateway.clone(), std::sync::Arc::new(MemoryStore::new()));
        ensure_namespace(&ctx, "default").await;

        let deployment = Deployment {
            metadata: meta("web"),
            spec: Some(k8s_openapi::api::apps::v1::DeploymentSpec {
                template: PodTemplateSpec {
                    spec: Some(PodSpec {
                        containers: vec![Container {
                            name: "web".to_string(),
                            image: Some("nginx:1.25".to_string()),
                            ports: Some(vec![k8s_openapi::api::core::v1::ContainerPort {
                                container_port: 8080,
                                ..Default::default()
                            }]),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                ..Default::default()
            }),
            ..Default::default()
        };
        workload::create_deployment(&ctx, "default", &deployment)
            .await
            .expect("creating deployment");

        let svc = Service {
            metadata: meta("api"),
            spec: Some(ServiceSpec {
                type_: Some("NodePort".to_string()),
                selector: Some(BTreeMap::from([("app".to_string(), "web".to_string())])),
                ports: Some(vec![ServicePort {
                    port: 8080,
                    target_port: Some(IntOrString::Int(8080)),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        };
        let created = service::create(&ctx, "default", &svc).await.expect("creating service");
        let node_port = created
            .spec
            .as_ref()
            .and_then(|s| s.ports.as_ref())
            .and_then(|p| p.first())
            .and_then(|p| p.node_port)
            .expect("node port drawn");
        assert!((30000..=32767).contains(&node_port));

        for _ in 0..3 {
            let containers = gateway.list_containers(None).await.expect("listing containers");
            assert!(containers.iter().any(|c| c.name == "default-web"));
        }
    }

    /// Scenario 5: a PVC backs an engine volume that a Pod mounts, and
    /// deleting the PVC retains the PV.
    #[tokio::test]
    async fn pvc_binds_volume_and_retains_pv_on_delete() {
        let (_engine, gateway) = spawn_engine().await;
        let ctx = test_context(gateway, std::sync::Arc::new(MemoryStore::new()));
        ensure_namespace(&ctx, "default").await;

        let pvc = PersistentVolumeClaim {
            metadata: meta("data"),
            spec: Some(PersistentVolumeClaimSpec {
                storage_class_name: Some("local".to_string()),
                resources: Some(VolumeResourceRequirements {
                    requests: Some(BTreeMap::from([("storage".to_string(), Quantity("1Gi".to_string()))])),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        persistentvolumeclaim::create(&ctx, "default", &pvc)
            .await
            .expect("creating pvc");

        let pod = Pod {
            metadata: meta("writer"),
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: "writer".to_string(),
                    image: Some("busybox:stable".to_string()),
                    volume_mounts: Some(vec![VolumeMount {
                        name: "data".to_string(),
                        mount_path: "/data".to_string(),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }],
                volumes: Some(vec![Volume {
                    name: "data".to_string(),
                    persistent_volume_claim: Some(k8s_openapi::api::core::v1::PersistentVolumeClaimVolumeSource {
                        claim_name: "data".to_string(),
                        read_only: None,
                    }),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        };
        pod::create(&ctx, "default", &pod).await.expect("creating pod");

        let pv = persistentvolume::get(&ctx, "k2d-pv-default-data")
            .await
            .expect("getting pv");
        assert_eq!(
            pv.status.as_ref().and_then(|s| s.phase.clone()),
            Some("Bound".to_string())
        );

        persistentvolumeclaim::delete(&ctx, "default", "data")
            .await
            .expect("deleting pvc");

        let pv_after = persistentvolume::get(&ctx, "k2d-pv-default-data")
            .await
            .expect("pv still exists after pvc delete");
        assert_eq!(
            pv_after.status.as_ref().and_then(|s| s.phase.clone()),
            Some("Released".to_string())
        );
    }

    /// Scenario 6: with the filesystem store, a ConfigMap mounted into a
    /// Pod surfaces as a host-path bind at the documented on-disk layout.
    #[tokio::test]
    async fn filesystem_store_configmap_mount_lands_at_documented_path() {
        let (_engine, gateway) = spawn_engine().await;
        let data_dir = tempfile::tempdir().expect("creating temp store root");
        let store = std::sync::Arc::new(
            FilesystemStore::new(data_dir.path()).expect("constructing filesystem store"),
        );
        let ctx = test_context(gateway, store);
        ensure_namespace(&ctx, "default").await;

        let mut data = BTreeMap::new();
        data.insert("greeting".to_string(), "hi".to_string());
        let config_map = ConfigMap {
            metadata: meta("cfg"),
            data: Some(data),
            ..Default::default()
        };
        configmap::create(&ctx, "default", &config_map).await.expect("creating configmap");

        let pod = Pod {
            metadata: meta("reader"),
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: "reader".to_string(),
                    image: Some("busybox:stable".to_string()),
                    volume_mounts: Some(vec![VolumeMount {
                        name: "cfg".to_string(),
                        mount_path: "/etc/cfg".to_string(),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }],
                volumes: Some(vec![Volume {
                    name: "cfg".to_string(),
                    config_map: Some(k8s_openapi::api::core::v1::ConfigMapVolumeSource {
                        name: Some("cfg".to_string()),
                        ..Default::default()
                    }),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        };
        pod::create(&ctx, "default", &pod).await.expect("creating pod");

        let expected_file = data_dir
            .path()
            .join("configmaps")
            .join("default-cfg-k2dcm-greeting");
        let content = std::fs::read_to_string(&expected_file).expect("reading configmap data file");
        assert_eq!(content, "hi");

        let listed = configmap::list(&ctx, "default", &k2d_store::LabelSelector::default())
            .await
            .expect("listing configmaps");
        let cfg = listed.iter().find(|c| c.metadata.name.as_deref() == Some("cfg")).expect("cfg listed");
        assert!(cfg.metadata.creation_timestamp.is_some());
    }
}
