use anyhow::{Context as _, Result};
use async_trait::async_trait;
use chrono::Local;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{
    ConfigMap, Endpoints, Event, Namespace, Node, PersistentVolume, PersistentVolumeClaim, Pod,
    ReplicationController, Secret, Service, ServiceAccount,
};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::policy::v1::PodDisruptionBudget;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Api, Client, Config, ResourceExt};
use serde_json::Value;

use crate::color::ACTIVE_CONTEXT_MARK;
use crate::model::{AutoscalerVersion, BuiltinKind, NamespaceScope, RowData, TableData};

/// Everything the command core needs from a cluster: listings for the
/// built-in kinds, dynamic listings for discovered kinds, raw custom
/// resource definitions, the capability probe and the two binding fetches
/// the drill-down resolvers depend on.
#[async_trait]
pub trait Connection: Send + Sync {
    fn default_namespace(&self) -> String;

    /// API versions the cluster serves for a discovery group. The core
    /// group is addressed by the empty string.
    async fn group_versions(&self, group: &str) -> Result<Vec<String>>;

    /// Raw custom resource definition documents, shaped for tolerant
    /// field extraction rather than typed deserialization.
    async fn raw_custom_resource_definitions(&self) -> Result<Vec<Value>>;

    async fn list_builtin(&self, kind: BuiltinKind, scope: &NamespaceScope) -> Result<TableData>;

    async fn list_autoscalers(
        &self,
        version: AutoscalerVersion,
        scope: &NamespaceScope,
    ) -> Result<TableData>;

    async fn list_custom(
        &self,
        group: &str,
        version: &str,
        kind: &str,
        name: &str,
        scope: &NamespaceScope,
    ) -> Result<TableData>;

    /// Name of the cluster role a cluster role binding references.
    async fn cluster_role_binding_role(&self, name: &str) -> Result<String>;

    /// Name of the role a namespaced role binding references.
    async fn role_binding_role(&self, namespace: &str, name: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct ContextRow {
    pub name: String,
    pub cluster: String,
    pub auth_info: String,
    pub namespace: String,
}

#[derive(Clone)]
pub struct KubeGateway {
    client: Client,
    context: String,
    cluster: String,
    default_namespace: String,
    contexts: Vec<ContextRow>,
}

impl KubeGateway {
    pub async fn with_context(context: Option<String>) -> Result<Self> {
        let kubeconfig = Kubeconfig::read().ok();

        let config = if let Some(kubeconfig_value) = kubeconfig.clone() {
            let options = KubeConfigOptions {
                context: context.clone(),
                cluster: None,
                user: None,
            };
            Config::from_custom_kubeconfig(kubeconfig_value, &options)
                .await
                .context("failed to load Kubernetes configuration")?
        } else {
            if context.is_some() {
                anyhow::bail!("kubeconfig not found; context selection is unavailable");
            }
            Config::infer()
                .await
                .context("failed to infer Kubernetes configuration")?
        };

        let cluster = config.cluster_url.to_string();
        let default_namespace = config.default_namespace.clone();
        let client = Client::try_from(config).context("failed to initialize Kubernetes client")?;

        let active_context = context
            .or_else(|| {
                kubeconfig
                    .as_ref()
                    .and_then(|cfg| cfg.current_context.clone())
            })
            .unwrap_or_else(|| "in-cluster".to_string());
        let contexts = kubeconfig
            .as_ref()
            .map(|cfg| context_rows(cfg, &default_namespace))
            .unwrap_or_default();

        Ok(Self {
            client,
            context: active_context,
            cluster,
            default_namespace,
            contexts,
        })
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn set_default_namespace(&mut self, namespace: String) {
        self.default_namespace = namespace;
    }

    async fn list_namespaced<K>(&self, scope: &NamespaceScope) -> Result<Vec<K>>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>
            + Clone
            + serde::de::DeserializeOwned
            + std::fmt::Debug,
        K::DynamicType: Default,
    {
        let api: Api<K> = match scope {
            NamespaceScope::All => Api::all(self.client.clone()),
            NamespaceScope::Named(namespace) => Api::namespaced(self.client.clone(), namespace),
        };
        Ok(api.list(&list_params()).await?.items)
    }

    async fn list_cluster<K>(&self) -> Result<Vec<K>>
    where
        K: kube::Resource + Clone + serde::de::DeserializeOwned + std::fmt::Debug,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::all(self.client.clone());
        Ok(api.list(&list_params()).await?.items)
    }

    async fn fetch_pods(&self, scope: &NamespaceScope) -> Result<TableData> {
        let pods: Vec<Pod> = self.list_namespaced(scope).await?;
        let rows = pods
            .into_iter()
            .map(|pod| {
                let name = pod.name_any();
                let namespace = pod.namespace();
                let (ready, total, restarts) = pod_readiness(&pod);
                let age = human_age(pod.metadata.creation_timestamp.as_ref());
                let status = pod_status(&pod);
                RowData {
                    name: name.clone(),
                    namespace,
                    columns: vec![
                        name,
                        format!("{ready}/{total}"),
                        status,
                        restarts.to_string(),
                        age,
                    ],
                }
            })
            .collect();
        Ok(table_data(
            &["Name", "Ready", "Status", "Restarts", "Age"],
            rows,
        ))
    }

    async fn fetch_deployments(&self, scope: &NamespaceScope) -> Result<TableData> {
        let deployments: Vec<Deployment> = self.list_namespaced(scope).await?;
        let rows = deployments
            .into_iter()
            .map(|deployment| {
                let name = deployment.name_any();
                let namespace = deployment.namespace();
                let desired = deployment
                    .spec
                    .as_ref()
                    .and_then(|spec| spec.replicas)
                    .unwrap_or(0);
                let status = deployment.status.as_ref();
                let ready = status.and_then(|s| s.ready_replicas).unwrap_or(0);
                let updated = status.and_then(|s| s.updated_replicas).unwrap_or(0);
                let available = status.and_then(|s| s.available_replicas).unwrap_or(0);
                let age = human_age(deployment.metadata.creation_timestamp.as_ref());
                RowData {
                    name: name.clone(),
                    namespace,
                    columns: vec![
                        name,
                        format!("{ready}/{desired}"),
                        updated.to_string(),
                        available.to_string(),
                        age,
                    ],
                }
            })
            .collect();
        Ok(table_data(
            &["Name", "Ready", "Up-to-date", "Available", "Age"],
            rows,
        ))
    }

    async fn fetch_daemonsets(&self, scope: &NamespaceScope) -> Result<TableData> {
        let daemonsets: Vec<DaemonSet> = self.list_namespaced(scope).await?;
        let rows = daemonsets
            .into_iter()
            .map(|daemonset| {
                let name = daemonset.name_any();
                let namespace = daemonset.namespace();
                let status = daemonset.status.as_ref();
                let desired = status.map(|s| s.desired_number_scheduled).unwrap_or(0);
                let current = status.map(|s| s.current_number_scheduled).unwrap_or(0);
                let ready = status.map(|s| s.number_ready).unwrap_or(0);
                let age = human_age(daemonset.metadata.creation_timestamp.as_ref());
                RowData {
                    name: name.clone(),
                    namespace,
                    columns: vec![
                        name,
                        desired.to_string(),
                        current.to_string(),
                        ready.to_string(),
                        age,
                    ],
                }
            })
            .collect();
        Ok(table_data(
            &["Name", "Desired", "Current", "Ready", "Age"],
            rows,
        ))
    }

    async fn fetch_replicasets(&self, scope: &NamespaceScope) -> Result<TableData> {
        let replicasets: Vec<ReplicaSet> = self.list_namespaced(scope).await?;
        let rows = replicasets
            .into_iter()
            .map(|replicaset| {
                let name = replicaset.name_any();
                let namespace = replicaset.namespace();
                let desired = replicaset
                    .spec
                    .as_ref()
                    .and_then(|spec| spec.replicas)
                    .unwrap_or(0);
                let status = replicaset.status.as_ref();
                let current = status.map(|s| s.replicas).unwrap_or(0);
                let ready = status.and_then(|s| s.ready_replicas).unwrap_or(0);
                let age = human_age(replicaset.metadata.creation_timestamp.as_ref());
                RowData {
                    name: name.clone(),
                    namespace,
                    columns: vec![
                        name,
                        desired.to_string(),
                        current.to_string(),
                        ready.to_string(),
                        age,
                    ],
                }
            })
            .collect();
        Ok(table_data(
            &["Name", "Desired", "Current", "Ready", "Age"],
            rows,
        ))
    }

    async fn fetch_replication_controllers(&self, scope: &NamespaceScope) -> Result<TableData> {
        let controllers: Vec<ReplicationController> = self.list_namespaced(scope).await?;
        let rows = controllers
            .into_iter()
            .map(|controller| {
                let name = controller.name_any();
                let namespace = controller.namespace();
                let desired = controller
                    .spec
                    .as_ref()
                    .and_then(|spec| spec.replicas)
                    .unwrap_or(0);
                let status = controller.status.as_ref();
                let current = status.map(|s| s.replicas).unwrap_or(0);
                let ready = status.and_then(|s| s.ready_replicas).unwrap_or(0);
                let age = human_age(controller.metadata.creation_timestamp.as_ref());
                RowData {
                    name: name.clone(),
                    namespace,
                    columns: vec![
                        name,
                        desired.to_string(),
                        current.to_string(),
                        ready.to_string(),
                        age,
                    ],
                }
            })
            .collect();
        Ok(table_data(
            &["Name", "Desired", "Current", "Ready", "Age"],
            rows,
        ))
    }

    async fn fetch_statefulsets(&self, scope: &NamespaceScope) -> Result<TableData> {
        let statefulsets: Vec<StatefulSet> = self.list_namespaced(scope).await?;
        let rows = statefulsets
            .into_iter()
            .map(|statefulset| {
                let name = statefulset.name_any();
                let namespace = statefulset.namespace();
                let desired = statefulset
                    .spec
                    .as_ref()
                    .and_then(|spec| spec.replicas)
                    .unwrap_or(0);
                let ready = statefulset
                    .status
                    .as_ref()
                    .and_then(|s| s.ready_replicas)
                    .unwrap_or(0);
                let age = human_age(statefulset.metadata.creation_timestamp.as_ref());
                RowData {
                    name: name.clone(),
                    namespace,
                    columns: vec![name, format!("{ready}/{desired}"), age],
                }
            })
            .collect();
        Ok(table_data(&["Name", "Ready", "Age"], rows))
    }

    async fn fetch_cronjobs(&self, scope: &NamespaceScope) -> Result<TableData> {
        let cronjobs: Vec<CronJob> = self.list_namespaced(scope).await?;
        let rows = cronjobs
            .into_iter()
            .map(|cronjob| {
                let name = cronjob.name_any();
                let namespace = cronjob.namespace();
                let spec = cronjob.spec.as_ref();
                let schedule = spec
                    .map(|s| s.schedule.clone())
                    .unwrap_or_else(|| "-".to_string());
                let suspend = spec
                    .and_then(|s| s.suspend)
                    .unwrap_or(false)
                    .to_string();
                let active = cronjob
                    .status
                    .as_ref()
                    .and_then(|s| s.active.as_ref())
                    .map(|active| active.len())
                    .unwrap_or(0);
                let last_schedule = cronjob
                    .status
                    .as_ref()
                    .and_then(|s| s.last_schedule_time.as_ref())
                    .map(|time| human_age(Some(time)))
                    .unwrap_or_else(|| "-".to_string());
                let age = human_age(cronjob.metadata.creation_timestamp.as_ref());
                RowData {
                    name: name.clone(),
                    namespace,
                    columns: vec![
                        name,
                        schedule,
                        suspend,
                        active.to_string(),
                        last_schedule,
                        age,
                    ],
                }
            })
            .collect();
        Ok(table_data(
            &["Name", "Schedule", "Suspend", "Active", "Last Schedule", "Age"],
            rows,
        ))
    }

    async fn fetch_jobs(&self, scope: &NamespaceScope) -> Result<TableData> {
        let jobs: Vec<Job> = self.list_namespaced(scope).await?;
        let rows = jobs
            .into_iter()
            .map(|job| {
                let name = job.name_any();
                let namespace = job.namespace();
                let completions = job
                    .spec
                    .as_ref()
                    .and_then(|spec| spec.completions)
                    .unwrap_or(1);
                let succeeded = job
                    .status
                    .as_ref()
                    .and_then(|status| status.succeeded)
                    .unwrap_or(0);
                let age = human_age(job.metadata.creation_timestamp.as_ref());
                RowData {
                    name: name.clone(),
                    namespace,
                    columns: vec![name, format!("{succeeded}/{completions}"), age],
                }
            })
            .collect();
        Ok(table_data(&["Name", "Completions", "Age"], rows))
    }

    async fn fetch_services(&self, scope: &NamespaceScope) -> Result<TableData> {
        let services: Vec<Service> = self.list_namespaced(scope).await?;
        let rows = services
            .into_iter()
            .map(|service| {
                let name = service.name_any();
                let namespace = service.namespace();
                let spec = service.spec.as_ref();
                let type_ = spec
                    .and_then(|s| s.type_.clone())
                    .unwrap_or_else(|| "ClusterIP".to_string());
                let cluster_ip = spec
                    .and_then(|s| s.cluster_ip.clone())
                    .unwrap_or_else(|| "-".to_string());
                let ports = service_ports_summary(&service);
                let age = human_age(service.metadata.creation_timestamp.as_ref());
                RowData {
                    name: name.clone(),
                    namespace,
                    columns: vec![name, type_, cluster_ip, ports, age],
                }
            })
            .collect();
        Ok(table_data(
            &["Name", "Type", "Cluster-IP", "Ports", "Age"],
            rows,
        ))
    }

    async fn fetch_ingresses(&self, scope: &NamespaceScope) -> Result<TableData> {
        let ingresses: Vec<Ingress> = self.list_namespaced(scope).await?;
        let rows = ingresses
            .into_iter()
            .map(|ingress| {
                let name = ingress.name_any();
                let namespace = ingress.namespace();
                let spec = ingress.spec.as_ref();
                let class = spec
                    .and_then(|s| s.ingress_class_name.clone())
                    .unwrap_or_else(|| "-".to_string());
                let hosts = spec
                    .and_then(|s| s.rules.as_ref())
                    .map(|rules| {
                        rules
                            .iter()
                            .filter_map(|rule| rule.host.clone())
                            .collect::<Vec<_>>()
                            .join(",")
                    })
                    .filter(|hosts| !hosts.is_empty())
                    .unwrap_or_else(|| "*".to_string());
                let age = human_age(ingress.metadata.creation_timestamp.as_ref());
                RowData {
                    name: name.clone(),
                    namespace,
                    columns: vec![name, class, truncate(&hosts, 60), age],
                }
            })
            .collect();
        Ok(table_data(&["Name", "Class", "Hosts", "Age"], rows))
    }

    async fn fetch_endpoints(&self, scope: &NamespaceScope) -> Result<TableData> {
        let endpoints: Vec<Endpoints> = self.list_namespaced(scope).await?;
        let rows = endpoints
            .into_iter()
            .map(|endpoint| {
                let name = endpoint.name_any();
                let namespace = endpoint.namespace();
                let summary = endpoints_summary(&endpoint);
                let age = human_age(endpoint.metadata.creation_timestamp.as_ref());
                RowData {
                    name: name.clone(),
                    namespace,
                    columns: vec![name, truncate(&summary, 60), age],
                }
            })
            .collect();
        Ok(table_data(&["Name", "Endpoints", "Age"], rows))
    }

    async fn fetch_configmaps(&self, scope: &NamespaceScope) -> Result<TableData> {
        let configmaps: Vec<ConfigMap> = self.list_namespaced(scope).await?;
        let rows = configmaps
            .into_iter()
            .map(|configmap| {
                let name = configmap.name_any();
                let namespace = configmap.namespace();
                let entries = configmap.data.as_ref().map(|d| d.len()).unwrap_or(0)
                    + configmap
                        .binary_data
                        .as_ref()
                        .map(|d| d.len())
                        .unwrap_or(0);
                let age = human_age(configmap.metadata.creation_timestamp.as_ref());
                RowData {
                    name: name.clone(),
                    namespace,
                    columns: vec![name, entries.to_string(), age],
                }
            })
            .collect();
        Ok(table_data(&["Name", "Data", "Age"], rows))
    }

    async fn fetch_secrets(&self, scope: &NamespaceScope) -> Result<TableData> {
        let secrets: Vec<Secret> = self.list_namespaced(scope).await?;
        let rows = secrets
            .into_iter()
            .map(|secret| {
                let name = secret.name_any();
                let namespace = secret.namespace();
                let type_ = secret.type_.clone().unwrap_or_else(|| "Opaque".to_string());
                let entries = secret.data.as_ref().map(|d| d.len()).unwrap_or(0);
                let age = human_age(secret.metadata.creation_timestamp.as_ref());
                RowData {
                    name: name.clone(),
                    namespace,
                    columns: vec![name, type_, entries.to_string(), age],
                }
            })
            .collect();
        Ok(table_data(&["Name", "Type", "Data", "Age"], rows))
    }

    async fn fetch_service_accounts(&self, scope: &NamespaceScope) -> Result<TableData> {
        let accounts: Vec<ServiceAccount> = self.list_namespaced(scope).await?;
        let rows = accounts
            .into_iter()
            .map(|account| {
                let name = account.name_any();
                let namespace = account.namespace();
                let secrets = account.secrets.as_ref().map(|s| s.len()).unwrap_or(0);
                let age = human_age(account.metadata.creation_timestamp.as_ref());
                RowData {
                    name: name.clone(),
                    namespace,
                    columns: vec![name, secrets.to_string(), age],
                }
            })
            .collect();
        Ok(table_data(&["Name", "Secrets", "Age"], rows))
    }

    async fn fetch_roles(&self, scope: &NamespaceScope) -> Result<TableData> {
        let roles: Vec<Role> = self.list_namespaced(scope).await?;
        let rows = roles
            .into_iter()
            .map(|role| {
                let name = role.name_any();
                let namespace = role.namespace();
                let age = human_age(role.metadata.creation_timestamp.as_ref());
                RowData {
                    name: name.clone(),
                    namespace,
                    columns: vec![name, age],
                }
            })
            .collect();
        Ok(table_data(&["Name", "Age"], rows))
    }

    async fn fetch_role_bindings(&self, scope: &NamespaceScope) -> Result<TableData> {
        let bindings: Vec<RoleBinding> = self.list_namespaced(scope).await?;
        let rows = bindings
            .into_iter()
            .map(|binding| {
                let name = binding.name_any();
                let namespace = binding.namespace();
                let role = binding.role_ref.name.clone();
                let subjects = binding.subjects.as_ref().map(|s| s.len()).unwrap_or(0);
                let age = human_age(binding.metadata.creation_timestamp.as_ref());
                RowData {
                    name: name.clone(),
                    namespace,
                    columns: vec![name, role, subjects.to_string(), age],
                }
            })
            .collect();
        Ok(table_data(&["Name", "Role", "Subjects", "Age"], rows))
    }

    async fn fetch_cluster_roles(&self) -> Result<TableData> {
        let roles: Vec<ClusterRole> = self.list_cluster().await?;
        let rows = roles
            .into_iter()
            .map(|role| {
                let name = role.name_any();
                let age = human_age(role.metadata.creation_timestamp.as_ref());
                RowData {
                    name: name.clone(),
                    namespace: None,
                    columns: vec![name, age],
                }
            })
            .collect();
        Ok(table_data(&["Name", "Age"], rows))
    }

    async fn fetch_cluster_role_bindings(&self) -> Result<TableData> {
        let bindings: Vec<ClusterRoleBinding> = self.list_cluster().await?;
        let rows = bindings
            .into_iter()
            .map(|binding| {
                let name = binding.name_any();
                let role = binding.role_ref.name.clone();
                let subjects = binding.subjects.as_ref().map(|s| s.len()).unwrap_or(0);
                let age = human_age(binding.metadata.creation_timestamp.as_ref());
                RowData {
                    name: name.clone(),
                    namespace: None,
                    columns: vec![name, role, subjects.to_string(), age],
                }
            })
            .collect();
        Ok(table_data(&["Name", "Role", "Subjects", "Age"], rows))
    }

    async fn fetch_nodes(&self) -> Result<TableData> {
        let nodes: Vec<Node> = self.list_cluster().await?;
        let rows = nodes
            .into_iter()
            .map(|node| {
                let name = node.name_any();
                let status = node_status(&node);
                let version = node
                    .status
                    .as_ref()
                    .and_then(|s| s.node_info.as_ref())
                    .map(|info| info.kubelet_version.clone())
                    .unwrap_or_else(|| "-".to_string());
                let age = human_age(node.metadata.creation_timestamp.as_ref());
                RowData {
                    name: name.clone(),
                    namespace: None,
                    columns: vec![name, status, version, age],
                }
            })
            .collect();
        Ok(table_data(&["Name", "Status", "Version", "Age"], rows))
    }

    async fn fetch_namespaces(&self) -> Result<TableData> {
        let namespaces: Vec<Namespace> = self.list_cluster().await?;
        let rows = namespaces
            .into_iter()
            .map(|namespace| {
                let name = namespace.name_any();
                let phase = namespace
                    .status
                    .as_ref()
                    .and_then(|s| s.phase.clone())
                    .unwrap_or_else(|| "-".to_string());
                let age = human_age(namespace.metadata.creation_timestamp.as_ref());
                RowData {
                    name: name.clone(),
                    namespace: None,
                    columns: vec![name, phase, age],
                }
            })
            .collect();
        Ok(table_data(&["Name", "Status", "Age"], rows))
    }

    async fn fetch_pod_disruption_budgets(&self, scope: &NamespaceScope) -> Result<TableData> {
        let budgets: Vec<PodDisruptionBudget> = self.list_namespaced(scope).await?;
        let rows = budgets
            .into_iter()
            .map(|budget| {
                let name = budget.name_any();
                let namespace = budget.namespace();
                let spec = budget.spec.as_ref();
                let min_available = spec
                    .and_then(|s| s.min_available.as_ref())
                    .map(int_or_string)
                    .unwrap_or_else(|| "-".to_string());
                let max_unavailable = spec
                    .and_then(|s| s.max_unavailable.as_ref())
                    .map(int_or_string)
                    .unwrap_or_else(|| "-".to_string());
                let allowed = budget
                    .status
                    .as_ref()
                    .map(|s| s.disruptions_allowed)
                    .unwrap_or(0);
                let age = human_age(budget.metadata.creation_timestamp.as_ref());
                RowData {
                    name: name.clone(),
                    namespace,
                    columns: vec![
                        name,
                        min_available,
                        max_unavailable,
                        allowed.to_string(),
                        age,
                    ],
                }
            })
            .collect();
        Ok(table_data(
            &["Name", "Min Available", "Max Unavailable", "Allowed Disruptions", "Age"],
            rows,
        ))
    }

    async fn fetch_persistent_volumes(&self) -> Result<TableData> {
        let volumes: Vec<PersistentVolume> = self.list_cluster().await?;
        let rows = volumes
            .into_iter()
            .map(|volume| {
                let name = volume.name_any();
                let spec = volume.spec.as_ref();
                let capacity = spec
                    .and_then(|s| s.capacity.as_ref())
                    .and_then(|capacity| capacity.get("storage"))
                    .map(|quantity| quantity.0.clone())
                    .unwrap_or_else(|| "-".to_string());
                let phase = volume
                    .status
                    .as_ref()
                    .and_then(|s| s.phase.clone())
                    .unwrap_or_else(|| "-".to_string());
                let claim = spec
                    .and_then(|s| s.claim_ref.as_ref())
                    .map(|claim| {
                        format!(
                            "{}/{}",
                            claim.namespace.clone().unwrap_or_default(),
                            claim.name.clone().unwrap_or_default(),
                        )
                    })
                    .unwrap_or_else(|| "-".to_string());
                let age = human_age(volume.metadata.creation_timestamp.as_ref());
                RowData {
                    name: name.clone(),
                    namespace: None,
                    columns: vec![name, capacity, phase, claim, age],
                }
            })
            .collect();
        Ok(table_data(
            &["Name", "Capacity", "Status", "Claim", "Age"],
            rows,
        ))
    }

    async fn fetch_persistent_volume_claims(&self, scope: &NamespaceScope) -> Result<TableData> {
        let claims: Vec<PersistentVolumeClaim> = self.list_namespaced(scope).await?;
        let rows = claims
            .into_iter()
            .map(|claim| {
                let name = claim.name_any();
                let namespace = claim.namespace();
                let phase = claim
                    .status
                    .as_ref()
                    .and_then(|s| s.phase.clone())
                    .unwrap_or_else(|| "-".to_string());
                let volume = claim
                    .spec
                    .as_ref()
                    .and_then(|s| s.volume_name.clone())
                    .unwrap_or_else(|| "-".to_string());
                let capacity = claim
                    .status
                    .as_ref()
                    .and_then(|s| s.capacity.as_ref())
                    .and_then(|capacity| capacity.get("storage"))
                    .map(|quantity| quantity.0.clone())
                    .unwrap_or_else(|| "-".to_string());
                let age = human_age(claim.metadata.creation_timestamp.as_ref());
                RowData {
                    name: name.clone(),
                    namespace,
                    columns: vec![name, phase, volume, capacity, age],
                }
            })
            .collect();
        Ok(table_data(
            &["Name", "Status", "Volume", "Capacity", "Age"],
            rows,
        ))
    }

    async fn fetch_events(&self, scope: &NamespaceScope) -> Result<TableData> {
        let mut events: Vec<Event> = self.list_namespaced(scope).await?;
        events.sort_by_key(|event| std::cmp::Reverse(event_timestamp_seconds(event)));
        let rows = events
            .into_iter()
            .map(|event| {
                let name = event.name_any();
                let namespace = event.namespace();
                let type_ = event.type_.clone().unwrap_or_else(|| "-".to_string());
                let reason = event.reason.clone().unwrap_or_else(|| "-".to_string());
                let object = format!(
                    "{}/{}",
                    event
                        .involved_object
                        .kind
                        .clone()
                        .unwrap_or_else(|| "-".to_string()),
                    event
                        .involved_object
                        .name
                        .clone()
                        .unwrap_or_else(|| "-".to_string()),
                );
                let count = event.count.unwrap_or(1);
                let age = event_age(&event);
                RowData {
                    name: name.clone(),
                    namespace,
                    columns: vec![name, type_, reason, object, count.to_string(), age],
                }
            })
            .collect();

        let mut table = TableData::default();
        table.set_rows(
            ["Name", "Type", "Reason", "Object", "Count", "Age"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
            rows,
            Local::now(),
        );
        Ok(table)
    }

    async fn fetch_custom_resource_definitions(&self) -> Result<TableData> {
        let definitions: Vec<CustomResourceDefinition> = self.list_cluster().await?;
        let rows = definitions
            .into_iter()
            .map(|definition| {
                let name = definition.name_any();
                let group = definition.spec.group.clone();
                let kind = definition.spec.names.kind.clone();
                let versions = definition
                    .spec
                    .versions
                    .iter()
                    .map(|version| version.name.clone())
                    .collect::<Vec<_>>()
                    .join(",");
                let age = human_age(definition.metadata.creation_timestamp.as_ref());
                RowData {
                    name: name.clone(),
                    namespace: None,
                    columns: vec![name, group, kind, versions, age],
                }
            })
            .collect();
        Ok(table_data(
            &["Name", "Group", "Kind", "Versions", "Age"],
            rows,
        ))
    }

    fn context_table(&self) -> TableData {
        let rows = self
            .contexts
            .iter()
            .map(|row| {
                let name = if row.name == self.context {
                    format!("{}{ACTIVE_CONTEXT_MARK}", row.name)
                } else {
                    row.name.clone()
                };
                RowData {
                    name: name.clone(),
                    namespace: None,
                    columns: vec![
                        name,
                        row.cluster.clone(),
                        row.auth_info.clone(),
                        row.namespace.clone(),
                    ],
                }
            })
            .collect();
        table_data(&["Name", "Cluster", "Auth Info", "Namespace"], rows)
    }
}

#[async_trait]
impl Connection for KubeGateway {
    fn default_namespace(&self) -> String {
        self.default_namespace.clone()
    }

    async fn group_versions(&self, group: &str) -> Result<Vec<String>> {
        if group.is_empty() {
            let versions = self
                .client
                .list_core_api_versions()
                .await
                .context("failed to list core API versions")?;
            return Ok(versions.versions);
        }

        let groups = self
            .client
            .list_api_groups()
            .await
            .context("failed to list API groups")?;
        Ok(groups
            .groups
            .into_iter()
            .find(|g| g.name == group)
            .map(|g| g.versions.into_iter().map(|v| v.version).collect())
            .unwrap_or_default())
    }

    async fn raw_custom_resource_definitions(&self) -> Result<Vec<Value>> {
        let gvk = GroupVersionKind::gvk("apiextensions.k8s.io", "v1", "CustomResourceDefinition");
        let resource = ApiResource::from_gvk_with_plural(&gvk, "customresourcedefinitions");
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &resource);
        let list = api
            .list(&list_params())
            .await
            .context("failed to list custom resource definitions")?;
        Ok(list.items.into_iter().map(|object| object.data).collect())
    }

    async fn list_builtin(&self, kind: BuiltinKind, scope: &NamespaceScope) -> Result<TableData> {
        match kind {
            BuiltinKind::ConfigMaps => self.fetch_configmaps(scope).await,
            BuiltinKind::ClusterRoles => self.fetch_cluster_roles().await,
            BuiltinKind::ClusterRoleBindings => self.fetch_cluster_role_bindings().await,
            BuiltinKind::CustomResourceDefinitions => {
                self.fetch_custom_resource_definitions().await
            }
            BuiltinKind::CronJobs => self.fetch_cronjobs(scope).await,
            BuiltinKind::Contexts => Ok(self.context_table()),
            BuiltinKind::DaemonSets => self.fetch_daemonsets(scope).await,
            BuiltinKind::Deployments => self.fetch_deployments(scope).await,
            BuiltinKind::Endpoints => self.fetch_endpoints(scope).await,
            BuiltinKind::Events => self.fetch_events(scope).await,
            BuiltinKind::Ingresses => self.fetch_ingresses(scope).await,
            BuiltinKind::Jobs => self.fetch_jobs(scope).await,
            BuiltinKind::Nodes => self.fetch_nodes().await,
            BuiltinKind::Namespaces => self.fetch_namespaces().await,
            BuiltinKind::PodDisruptionBudgets => {
                self.fetch_pod_disruption_budgets(scope).await
            }
            BuiltinKind::Pods => self.fetch_pods(scope).await,
            BuiltinKind::PersistentVolumes => self.fetch_persistent_volumes().await,
            BuiltinKind::PersistentVolumeClaims => {
                self.fetch_persistent_volume_claims(scope).await
            }
            BuiltinKind::RoleBindings => self.fetch_role_bindings(scope).await,
            BuiltinKind::ReplicationControllers => {
                self.fetch_replication_controllers(scope).await
            }
            BuiltinKind::Roles => self.fetch_roles(scope).await,
            BuiltinKind::ReplicaSets => self.fetch_replicasets(scope).await,
            BuiltinKind::ServiceAccounts => self.fetch_service_accounts(scope).await,
            BuiltinKind::Secrets => self.fetch_secrets(scope).await,
            BuiltinKind::StatefulSets => self.fetch_statefulsets(scope).await,
            BuiltinKind::Services => self.fetch_services(scope).await,
        }
    }

    async fn list_autoscalers(
        &self,
        version: AutoscalerVersion,
        scope: &NamespaceScope,
    ) -> Result<TableData> {
        let gvk = GroupVersionKind::gvk(
            "autoscaling",
            version.as_str(),
            "HorizontalPodAutoscaler",
        );
        let resource = ApiResource::from_gvk_with_plural(&gvk, "horizontalpodautoscalers");
        let api: Api<DynamicObject> = match scope {
            NamespaceScope::All => Api::all_with(self.client.clone(), &resource),
            NamespaceScope::Named(namespace) => {
                Api::namespaced_with(self.client.clone(), namespace, &resource)
            }
        };

        let list = api.list(&list_params()).await?;
        let rows = list
            .items
            .into_iter()
            .map(|object| {
                let name = object.name_any();
                let namespace = object.namespace();
                let age = human_age(object.metadata.creation_timestamp.as_ref());
                let spec = &object.data["spec"];
                let reference = format!(
                    "{}/{}",
                    spec["scaleTargetRef"]["kind"].as_str().unwrap_or("-"),
                    spec["scaleTargetRef"]["name"].as_str().unwrap_or("-"),
                );
                let targets = autoscaler_targets(version, &object.data);
                let min = spec["minReplicas"].as_i64().unwrap_or(1);
                let max = spec["maxReplicas"].as_i64().unwrap_or(0);
                let replicas = object.data["status"]["currentReplicas"]
                    .as_i64()
                    .unwrap_or(0);
                RowData {
                    name: name.clone(),
                    namespace,
                    columns: vec![
                        name,
                        reference,
                        targets,
                        min.to_string(),
                        max.to_string(),
                        replicas.to_string(),
                        age,
                    ],
                }
            })
            .collect();
        Ok(table_data(
            &["Name", "Reference", "Targets", "Min Pods", "Max Pods", "Replicas", "Age"],
            rows,
        ))
    }

    async fn list_custom(
        &self,
        group: &str,
        version: &str,
        kind: &str,
        name: &str,
        scope: &NamespaceScope,
    ) -> Result<TableData> {
        let gvk = GroupVersionKind::gvk(group, version, kind);
        let resource = ApiResource::from_gvk_with_plural(&gvk, name);
        let api: Api<DynamicObject> = match scope {
            NamespaceScope::All => Api::all_with(self.client.clone(), &resource),
            NamespaceScope::Named(namespace) => {
                Api::namespaced_with(self.client.clone(), namespace, &resource)
            }
        };

        let list = api.list(&list_params()).await?;
        let rows = list
            .items
            .into_iter()
            .map(|object| {
                let name = object.name_any();
                let namespace = object.namespace();
                let labels = object.metadata.labels.as_ref().map(|l| l.len()).unwrap_or(0);
                let age = human_age(object.metadata.creation_timestamp.as_ref());
                RowData {
                    name: name.clone(),
                    namespace: namespace.clone(),
                    columns: vec![
                        name,
                        namespace.unwrap_or_else(|| "-".to_string()),
                        labels.to_string(),
                        age,
                    ],
                }
            })
            .collect();
        Ok(table_data(
            &["Name", "Namespace", "Labels", "Age"],
            rows,
        ))
    }

    async fn cluster_role_binding_role(&self, name: &str) -> Result<String> {
        let api: Api<ClusterRoleBinding> = Api::all(self.client.clone());
        let binding = api
            .get(name)
            .await
            .with_context(|| format!("failed to fetch cluster role binding {name}"))?;
        Ok(binding.role_ref.name)
    }

    async fn role_binding_role(&self, namespace: &str, name: &str) -> Result<String> {
        let api: Api<RoleBinding> = Api::namespaced(self.client.clone(), namespace);
        let binding = api
            .get(name)
            .await
            .with_context(|| format!("failed to fetch role binding {namespace}/{name}"))?;
        Ok(binding.role_ref.name)
    }
}

fn context_rows(kubeconfig: &Kubeconfig, default_namespace: &str) -> Vec<ContextRow> {
    let mut rows = kubeconfig
        .contexts
        .iter()
        .filter_map(|named| {
            let context = named.context.as_ref()?;
            Some(ContextRow {
                name: named.name.clone(),
                cluster: context.cluster.clone(),
                auth_info: context.user.clone().unwrap_or_else(|| "-".to_string()),
                namespace: context
                    .namespace
                    .clone()
                    .unwrap_or_else(|| default_namespace.to_string()),
            })
        })
        .collect::<Vec<_>>();
    rows.sort_by(|left, right| left.name.cmp(&right.name));
    rows
}

fn table_data(headers: &[&str], mut rows: Vec<RowData>) -> TableData {
    rows.sort_by(|left, right| {
        left.namespace
            .cmp(&right.namespace)
            .then_with(|| left.name.cmp(&right.name))
    });
    let mut table = TableData::default();
    table.set_rows(
        headers.iter().map(|header| header.to_string()).collect(),
        rows,
        Local::now(),
    );
    table
}

fn list_params() -> ListParams {
    ListParams::default().limit(500)
}

fn pod_readiness(pod: &Pod) -> (usize, usize, i32) {
    let Some(status) = pod.status.as_ref() else {
        return (0, 0, 0);
    };
    let container_statuses = status.container_statuses.as_deref().unwrap_or(&[]);
    let total = container_statuses.len();
    let ready = container_statuses
        .iter()
        .filter(|container| container.ready)
        .count();
    let restarts = container_statuses
        .iter()
        .map(|container| container.restart_count)
        .sum();
    (ready, total, restarts)
}

/// A pod in the middle of something reports the reason, not the bare
/// phase: a waiting container's reason wins, and a deletion timestamp
/// shows as Terminating.
fn pod_status(pod: &Pod) -> String {
    if pod.metadata.deletion_timestamp.is_some() {
        return "Terminating".to_string();
    }

    if let Some(status) = pod.status.as_ref() {
        for container in status.container_statuses.as_deref().unwrap_or(&[]) {
            if let Some(waiting) = container.state.as_ref().and_then(|s| s.waiting.as_ref())
                && let Some(reason) = waiting.reason.as_ref()
                && !reason.is_empty()
            {
                return reason.clone();
            }
        }
        if let Some(phase) = status.phase.as_ref() {
            return phase.clone();
        }
    }

    "Unknown".to_string()
}

fn node_status(node: &Node) -> String {
    let ready = node
        .status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .and_then(|conditions| {
            conditions
                .iter()
                .find(|condition| condition.type_ == "Ready")
        })
        .map(|condition| condition.status == "True");

    match ready {
        Some(true) => "Ready".to_string(),
        Some(false) => "NotReady".to_string(),
        None => "Unknown".to_string(),
    }
}

fn service_ports_summary(service: &Service) -> String {
    let ports = service
        .spec
        .as_ref()
        .and_then(|spec| spec.ports.clone())
        .unwrap_or_default();
    if ports.is_empty() {
        return "-".to_string();
    }

    ports
        .into_iter()
        .map(|port| {
            let protocol = port.protocol.unwrap_or_else(|| "TCP".to_string());
            format!("{}/{}", port.port, protocol)
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn endpoints_summary(endpoints: &Endpoints) -> String {
    let mut targets = Vec::new();
    for subset in endpoints.subsets.as_deref().unwrap_or(&[]) {
        let port = subset
            .ports
            .as_ref()
            .and_then(|ports| ports.first())
            .map(|port| port.port);
        for address in subset.addresses.as_deref().unwrap_or(&[]) {
            match port {
                Some(port) => targets.push(format!("{}:{port}", address.ip)),
                None => targets.push(address.ip.clone()),
            }
        }
    }
    if targets.is_empty() {
        return "-".to_string();
    }
    targets.join(",")
}

fn autoscaler_targets(version: AutoscalerVersion, data: &Value) -> String {
    match version {
        AutoscalerVersion::V1 => {
            let target = data["spec"]["targetCPUUtilizationPercentage"].as_i64();
            let current = data["status"]["currentCPUUtilizationPercentage"].as_i64();
            match (current, target) {
                (Some(current), Some(target)) => format!("{current}%/{target}%"),
                (None, Some(target)) => format!("-/{target}%"),
                _ => "-".to_string(),
            }
        }
        AutoscalerVersion::V2Beta1 | AutoscalerVersion::V2Beta2 => {
            let Some(metrics) = data["spec"]["metrics"].as_array() else {
                return "-".to_string();
            };
            let names = metrics
                .iter()
                .filter_map(|metric| metric["resource"]["name"].as_str())
                .collect::<Vec<_>>();
            if names.is_empty() {
                "-".to_string()
            } else {
                names.join(",")
            }
        }
    }
}

fn int_or_string(value: &IntOrString) -> String {
    match value {
        IntOrString::Int(value) => value.to_string(),
        IntOrString::String(value) => value.clone(),
    }
}

fn event_age(event: &Event) -> String {
    if let Some(event_time) = event.event_time.as_ref() {
        return human_age_timestamp(event_time.0);
    }
    if let Some(last_timestamp) = event.last_timestamp.as_ref() {
        return human_age(Some(last_timestamp));
    }
    if let Some(first_timestamp) = event.first_timestamp.as_ref() {
        return human_age(Some(first_timestamp));
    }
    human_age(event.metadata.creation_timestamp.as_ref())
}

fn event_timestamp_seconds(event: &Event) -> i64 {
    event
        .event_time
        .as_ref()
        .map(|time| time.0.as_second())
        .or_else(|| event.last_timestamp.as_ref().map(|time| time.0.as_second()))
        .or_else(|| {
            event
                .first_timestamp
                .as_ref()
                .map(|time| time.0.as_second())
        })
        .or_else(|| {
            event
                .metadata
                .creation_timestamp
                .as_ref()
                .map(|time| time.0.as_second())
        })
        .unwrap_or(0)
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }

    let mut out = value
        .chars()
        .take(max.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

fn human_age(timestamp: Option<&Time>) -> String {
    let Some(timestamp) = timestamp else {
        return "-".to_string();
    };
    human_age_timestamp(timestamp.0)
}

fn human_age_timestamp(ts: k8s_openapi::jiff::Timestamp) -> String {
    let elapsed_seconds = (k8s_openapi::jiff::Timestamp::now().as_second() - ts.as_second()).max(0);
    format_elapsed_seconds(elapsed_seconds)
}

fn format_elapsed_seconds(seconds: i64) -> String {
    if seconds >= 86_400 {
        return format!("{}d", seconds / 86_400);
    }
    if seconds >= 3_600 {
        return format!("{}h", seconds / 3_600);
    }
    if seconds >= 60 {
        return format!("{}m", seconds / 60);
    }
    format!("{seconds}s")
}

#[cfg(test)]
mod tests {
    use super::{
        autoscaler_targets, format_elapsed_seconds, int_or_string, table_data, truncate,
    };
    use crate::model::{AutoscalerVersion, RowData};
    use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
    use serde_json::json;

    #[test]
    fn elapsed_seconds_format_ranges() {
        assert_eq!(format_elapsed_seconds(42), "42s");
        assert_eq!(format_elapsed_seconds(120), "2m");
        assert_eq!(format_elapsed_seconds(7_200), "2h");
        assert_eq!(format_elapsed_seconds(172_800), "2d");
    }

    #[test]
    fn truncate_appends_ellipsis() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }

    #[test]
    fn int_or_string_renders_both_shapes() {
        assert_eq!(int_or_string(&IntOrString::Int(3)), "3");
        assert_eq!(int_or_string(&IntOrString::String("25%".to_string())), "25%");
    }

    #[test]
    fn table_rows_sort_by_namespace_then_name() {
        let rows = vec![
            RowData {
                name: "zeta".to_string(),
                namespace: Some("default".to_string()),
                columns: vec![],
            },
            RowData {
                name: "alpha".to_string(),
                namespace: Some("default".to_string()),
                columns: vec![],
            },
            RowData {
                name: "beta".to_string(),
                namespace: Some("apps".to_string()),
                columns: vec![],
            },
        ];
        let table = table_data(&["Name"], rows);
        let names = table
            .rows
            .iter()
            .map(|row| row.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, ["beta", "alpha", "zeta"]);
    }

    #[test]
    fn autoscaler_targets_per_version() {
        let v1 = json!({
            "spec": {"targetCPUUtilizationPercentage": 80},
            "status": {"currentCPUUtilizationPercentage": 40},
        });
        assert_eq!(autoscaler_targets(AutoscalerVersion::V1, &v1), "40%/80%");

        let v2 = json!({
            "spec": {"metrics": [
                {"resource": {"name": "cpu"}},
                {"resource": {"name": "memory"}},
            ]},
        });
        assert_eq!(
            autoscaler_targets(AutoscalerVersion::V2Beta2, &v2),
            "cpu,memory",
        );
        assert_eq!(
            autoscaler_targets(AutoscalerVersion::V2Beta1, &json!({"spec": {}})),
            "-",
        );
    }
}
