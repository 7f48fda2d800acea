#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Typed Kubernetes resources: Gateway API kinds re-exported from
//! `gateway-api`, and the custom resources this control plane defines
//! (spec §6 "Input resources").

pub mod duration;
pub mod labels;
pub mod policy;
pub mod watch;

pub use self::labels::Labels;
pub use gateway_api::apis::experimental as gateway;
pub use k8s_openapi::{
    api::{
        self,
        coordination::v1::Lease,
        core::v1::{
            ConfigMap, Container, ContainerPort, Endpoints, HTTPGetAction, Namespace, Node,
            NodeSpec, Pod, PodSpec, PodStatus, Probe, Secret, Service, ServiceAccount,
            ServicePort, ServiceSpec,
        },
    },
    apimachinery::{
        self,
        pkg::{
            apis::meta::v1::{Condition, Time},
            util::intstr::IntOrString,
        },
    },
    NamespaceResourceScope,
};
pub use kube::{
    api::{Api, ListParams, ObjectMeta, Patch, PatchParams, Resource, ResourceExt},
    error::ErrorResponse,
    runtime::watcher::Event as WatchEvent,
    Client, Error,
};
