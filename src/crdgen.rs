use controller::api::v1alpha1::{LLMDeployment, LLMModel};
use kube::CustomResourceExt;

fn main() {
    print!("{}", serde_yaml::to_string(&LLMModel::crd()).unwrap());
    println!("---");
    print!("{}", serde_yaml::to_string(&LLMDeployment::crd()).unwrap());
}
